#[macro_use]
extern crate rocket;

use catalogue_api::config::Config;
use catalogue_api::db::DbConn;
use catalogue_api::fairings::{CronFairing, SentryFairing, ServicesFairing, SqsFairing};
use catalogue_api::telemetry;
use rocket::fairing::AdHoc;
use rocket::figment::providers::Env;
use rocket::serde::{json::Json, Serialize};
use rocket::{Build, Rocket};

#[derive(Serialize)]
struct Health {
  status: String,
}

#[get("/")]
async fn root() -> Json<Health> {
  Json(Health {
    status: "ok".into(),
  })
}

#[launch]
fn rocket() -> Rocket<Build> {
  let mut figment = rocket::Config::figment();

  if let Some(database_url) = Env::var("DATABASE_URL") {
    figment = figment.merge(("databases.default.url", database_url));
  }

  telemetry::init(&figment.profile().to_string());

  rocket::custom(figment)
    .attach(AdHoc::config::<Config>())
    .attach(DbConn::fairing())
    .attach(SentryFairing::fairing())
    .attach(ServicesFairing::fairing())
    .attach(SqsFairing::fairing())
    .attach(CronFairing::fairing())
    .mount("/", routes![root])
}
