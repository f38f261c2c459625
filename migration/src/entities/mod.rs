pub mod consumer_activity_summary;
pub mod farmer_connection;

pub use consumer_activity_summary::Entity as ConsumerActivitySummaryEntity;
pub use farmer_connection::Entity as FarmerConnectionEntity;
