pub mod order_store;
pub use order_store::OrderStore;
pub mod orders_repo;
pub use orders_repo::OrderRepository;
pub mod demo_repo;
pub use demo_repo::DemoOrderRepository;
