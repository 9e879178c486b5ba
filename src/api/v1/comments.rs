use crate::{
    api::v1::{
        articles::visible, check, ok_resp, parse_id, JSONResp, ValidToken,
    },
    db::{
        comments::{self, Comment},
        DbConn,
    },
    error::Error,
    timestamp::Timestamp,
};
use rocket_contrib::json::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    comment: Comment,
    author: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentForm {
    #[validate(length(min = 1, max = 5000))]
    body: String,
}

#[get("/articles/<id>/comments")]
pub fn comment_list(
    token: Option<ValidToken>,
    conn: DbConn,
    id: String,
) -> JSONResp<Vec<CommentView>> {
    let article = visible(&id, token.map(|t| t.user_id), &conn)?.id;
    let listed = comments::all_from_article(article, &conn)?
        .into_iter()
        .map(|(comment, author)| CommentView { comment, author })
        .collect();
    ok_resp(listed)
}

#[post("/articles/<id>/comments", data = "<form>")]
pub fn comment_create(
    token: ValidToken,
    conn: DbConn,
    id: String,
    form: Json<CommentForm>,
) -> JSONResp<CommentView> {
    check(&*form)?;
    let article = visible(&id, Some(token.user_id), &conn)?.id;
    let comment = comments::insert(
        Comment {
            id: Uuid::new_v4(),
            article_id: article,
            author_id: token.user_id,
            body: form.into_inner().body,
            created_at: Timestamp::now(),
            edited_at: None,
        },
        &conn,
    )?;
    ok_resp(CommentView {
        comment,
        author: token.username,
    })
}

#[delete("/comments/<id>")]
pub fn comment_delete(
    token: ValidToken,
    conn: DbConn,
    id: String,
) -> JSONResp<&'static str> {
    let comment = comments::get(parse_id(&id, "comment")?, &conn)?;
    if comment.author_id != token.user_id {
        return Err(Error::forbidden("only the author can delete a comment").into());
    }
    comments::delete(comment.id, &conn)?;
    ok_resp("Deleted comment")
}
