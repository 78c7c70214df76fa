mod uploads;
mod videos;

pub use uploads::{NewUploadSession, UploadStore, MAX_CHUNK_BYTES, MAX_VIDEO_BYTES};
pub use videos::VideoStore;

use crate::catalog::VideoCatalog;
use crate::objects::ObjectStore;

/// Application root binding a video catalog to an object store. Handlers
/// take a scoped store per request; stores are cheap clones over the
/// shared backends.
#[derive(Clone)]
pub struct Library<C, O>
where
    C: VideoCatalog,
    O: ObjectStore,
{
    catalog: C,
    objects: O,
}

impl<C, O> Library<C, O>
where
    C: VideoCatalog,
    O: ObjectStore,
{
    pub fn new(catalog: C, objects: O) -> Self {
        Self { catalog, objects }
    }

    pub fn uploads(&self) -> UploadStore<C, O> {
        UploadStore::new(self.catalog.clone(), self.objects.clone())
    }

    pub fn videos(&self) -> VideoStore<C, O> {
        VideoStore::new(self.catalog.clone(), self.objects.clone())
    }
}
