extern crate newsdesk;

use newsdesk::{config::Config, db, logger, setup_rocket::setup_rocket};

fn main() {
    dotenv::dotenv().ok();
    let (config, notices) = Config::from_env();
    logger::setup_logging(config.log_level, config.log_file.as_deref())
        .expect("failed to initialize logging");
    for notice in &notices {
        notice.log();
    }

    let pool = db::init_pool(&config.database_url, config.pool_size);
    log::info!(
        "Starting newsdesk with {} admin(s), daily article limit {}",
        config.admin_usernames.len(),
        config.daily_article_limit
    );
    let error = setup_rocket(config, pool).launch();
    log::error!("Rocket stopped: {}", error);
}
