//! HTTP handlers

mod health;
mod invoices;
mod product_events;
mod products;
mod users;

pub use health::{health, ready};
pub use invoices::{
    create_upload_slot, import_invoice, invoice_events_by_customer, invoices_by_customer,
    upload_invoice,
};
pub use product_events::{events_by_code, events_by_code_and_type, events_by_username};
pub use products::{create_product, delete_product, get_product, list_products, update_product};
pub use users::me;
