use crate::services::Services;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::{tokio, Orbit, Rocket};

/// Runs the queue worker for the lifetime of the server.
pub struct SqsFairing;

impl SqsFairing {
  pub fn fairing() -> impl Fairing {
    Self
  }

  fn init(&self, rocket: &Rocket<Orbit>) {
    let services = match rocket.state::<Services>() {
      Some(services) => services,
      None => {
        tracing::error!("services are not managed, queue worker not started");
        return;
      }
    };

    let worker = services.worker();
    let shutdown = rocket.shutdown();

    tokio::spawn(async move {
      tracing::info!("queue worker started");
      worker.run(shutdown).await;
    });
  }
}

#[rocket::async_trait]
impl Fairing for SqsFairing {
  fn info(&self) -> Info {
    Info {
      name: "sqs",
      kind: Kind::Liftoff,
    }
  }

  async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
    self.init(rocket);
  }
}
