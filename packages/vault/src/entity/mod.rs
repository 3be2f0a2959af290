pub mod blob_object;
