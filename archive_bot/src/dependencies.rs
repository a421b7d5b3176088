use std::sync::Arc;

use archive_core::helpers::dto::UploaderPrivacy;
use archive_core::upload::UploadSessions;

use crate::archive::{storage::ArchiveStorage, users::UserRegistry};

#[derive(Clone)]
pub struct BotDependencies {
    pub storage: ArchiveStorage,
    pub users: UserRegistry,
    pub uploads: Arc<UploadSessions>,
    pub privacy: UploaderPrivacy,
}
