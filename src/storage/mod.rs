pub mod backend;
pub mod local;
pub mod memory;
pub mod uploader;

pub use backend::{ObjectInfo, ObjectStore, ObjectStoreFactory, StorageError};
pub use local::LocalFsObjectStore;
pub use memory::{InMemoryObjectStore, StoredObject};
pub use uploader::{blob_key, folder_key, BlobUploader, UploadError, UploadPolicy, VIDEO_CONTENT_TYPE};
