pub mod pricing;
pub mod tools;
pub mod turn;
