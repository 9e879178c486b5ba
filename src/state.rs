/// The Rocket environment the server was launched in, managed as state so
/// handlers can tell production apart (secure cookies, debug logging).
pub struct Environment(pub rocket::config::Environment);
