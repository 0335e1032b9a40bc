pub mod utensil;

pub use utensil::Utensil;
