pub mod pricing;
pub mod finance;
pub mod lifecycle;
pub mod pending;
pub mod settlement;
pub mod gateway;

pub use pricing::PricingPolicy;
pub use finance::SplitBreakdown;
pub use lifecycle::PickupManager;
pub use pending::PendingItem;
pub use settlement::PaymentService;
pub use gateway::{RazorpayGateway, SimulatedGateway};
