mod catalog_test;
mod recovery_test;
mod store_test;
