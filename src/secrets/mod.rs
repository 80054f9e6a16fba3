mod store;

pub use store::{
    credentials_path, delete_password, delete_password_in, get_password, get_password_in,
    store_password, store_password_in,
};
