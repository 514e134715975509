mod agent;
mod inquiry;
mod property;

pub use agent::{Agent, AgentSummary, NewAgent};
pub use inquiry::{Inquiry, InquiryStatus, NewInquiry};
pub use property::{
    ListingType, NewProperty, NewPropertyFeature, NewPropertyImage, Property, PropertyFeature,
    PropertyImage, PropertyStatus, PropertyType, PropertyUpdate,
};
