use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. JSON lines in release, readable text
/// everywhere else. Filtering follows `RUST_LOG`, defaulting to `info`.
pub fn init(profile: &str) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt().with_env_filter(filter);

  let result = if profile == "release" {
    builder.json().try_init()
  } else {
    builder.try_init()
  };

  if let Err(error) = result {
    eprintln!("tracing subscriber already installed: {}", error);
  }
}
