use crate::{
    api::v1::{ok_resp, JSONResp},
    db::{categories, categories::Category, DbConn},
};

#[get("/categories")]
pub fn category_list(conn: DbConn) -> JSONResp<Vec<Category>> {
    ok_resp(categories::all(&conn)?)
}
