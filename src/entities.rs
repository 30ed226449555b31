mod comment;
mod media;
mod project;

pub use comment::{Comment, CommentId, NewComment, ANONYMOUS_AUTHOR};
pub use media::{Media, MediaId, MediaType, NewMedia, UploadFile};
pub use project::{Project, ProjectId, ProjectSummary};
