use std::io;

pub fn setup_logging(
    verbosity: log::LevelFilter,
    log_file: Option<&str>,
) -> Result<(), fern::InitError> {
    let mut base_config = fern::Dispatch::new()
        .level(verbosity)
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("_", log::LevelFilter::Warn)
        .level_for("launch_", log::LevelFilter::Warn);

    let stdout_config = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .chain(io::stdout());
    base_config = base_config.chain(stdout_config);

    if let Some(path) = log_file {
        let file_config = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{}[{}][{}] {}",
                    chrono::Utc::now().to_rfc3339(),
                    record.target(),
                    record.level(),
                    message
                ))
            })
            .chain(fern::log_file(path)?);
        base_config = base_config.chain(file_config);
    }

    base_config.apply()?;

    Ok(())
}
