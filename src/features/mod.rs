pub mod category_spec;
pub mod category_store;
pub mod frame;
