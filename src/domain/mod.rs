pub mod geo;
pub mod lifecycle;
pub mod national_id;
pub mod pricing;
