use crate::{
    api::v1::{
        self, admin, api_keys, articles, categories, channels, comments,
        content, users,
    },
    config::Config,
    db::Pool,
    state,
};

use rocket::fairing::AdHoc;

pub fn setup_rocket(config: Config, pool: Pool) -> rocket::Rocket {
    rocket::ignite()
        .manage(pool)
        .manage(config)
        .mount(
            "/api/v1/",
            routes![
                users::user_create,
                users::user_login,
                users::user_change_pass,
                users::user_logout,
                users::user_delete,
                users::user_index,
                users::user_subscriptions,
                articles::article_list,
                articles::article_create,
                articles::article_get,
                articles::article_update,
                articles::article_delete,
                articles::article_toggle_status,
                articles::article_view,
                articles::reaction_set,
                articles::reaction_get,
                comments::comment_list,
                comments::comment_create,
                comments::comment_delete,
                channels::channel_list,
                channels::channel_create,
                channels::channel_get,
                channels::channel_update,
                channels::channel_subscribe,
                channels::channel_unsubscribe,
                channels::channel_subscribers,
                categories::category_list,
                admin::admin_channel_list,
                admin::admin_channel_update,
                admin::admin_article_get,
                admin::admin_article_update,
            ],
        )
        .mount(
            "/v1/",
            routes![
                api_keys::key_list,
                api_keys::key_create,
                api_keys::key_revoke,
                content::content_article_create,
                content::content_article_batch,
                content::content_article_get,
                content::content_channel_list,
                content::content_category_list,
            ],
        )
        .register(catchers![
            v1::bad_request,
            v1::unauthorized,
            v1::forbidden,
            v1::not_found,
            v1::unprocessable,
            v1::internal_error,
            v1::unavailable,
        ])
        .attach(AdHoc::on_attach("Environment tracker", |rocket| {
            let env = rocket.config().environment;
            Ok(rocket.manage(state::Environment(env)))
        }))
}
