pub mod currency;
pub mod deriv;
