pub mod change;
pub mod price;
pub mod product;
