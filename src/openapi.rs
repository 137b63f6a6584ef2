use crate::models::{AddedComment, AddedThread, CommentView, ThreadDetail};
use crate::routes::{PostCommentBody, PostThreadBody};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::post_thread,
        crate::routes::get_thread,
        crate::routes::post_comment,
        crate::routes::delete_comment,
    ),
    components(schemas(
        PostThreadBody, PostCommentBody,
        AddedThread, AddedComment, ThreadDetail, CommentView
    )),
    tags(
        (name = "threads", description = "Thread operations"),
        (name = "comments", description = "Comment operations"),
    )
)]
pub struct ApiDoc;
