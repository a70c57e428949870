use crate::audit::AuditLog;
use crate::aws::Clients;
use crate::config::{Config, InvalidRegion};
use crate::counters::{GameCounters, PgGameCounters};
use crate::db::DbConn;
use crate::dynamo::{DynamoTable, TableStore};
use crate::events::{EventPublisher, NoopPublisher, QueuePublisher, SnsPublisher};
use crate::images::ResizePipeline;
use crate::queue::{Queue, SqsQueue};
use crate::queue_handlers::{Dispatcher, FileUploadedHandler, GameCreatedHandler, GameDeletedHandler};
use crate::ratings::RatingStore;
use crate::reconciler::{CounterReconciler, RatingService};
use crate::reviews::ReviewStore;
use crate::storage::{ObjectStore, S3ObjectStore};
use crate::uploads::Uploader;
use crate::worker::QueueWorker;
use std::sync::Arc;
use std::time::Duration;

/// The backends every service is built on.
pub struct Backends {
  pub table: Arc<dyn TableStore>,
  pub objects: Arc<dyn ObjectStore>,
  pub queue: Arc<dyn Queue>,
  pub publisher: Arc<dyn EventPublisher>,
  pub counters: Arc<dyn GameCounters>,
}

impl Backends {
  pub fn aws(config: &Config, profile: &str, db_conn: Arc<DbConn>) -> Result<Self, InvalidRegion> {
    let clients = Clients::new(config)?;

    let publisher: Arc<dyn EventPublisher> = if !config.events_enabled(profile) {
      Arc::new(NoopPublisher)
    } else if let Some(topic_arn) = &config.sns_topic_arn {
      Arc::new(SnsPublisher::new(&clients, topic_arn.clone()))
    } else {
      Arc::new(QueuePublisher::new(&clients, config.queue_url.clone()))
    };

    Ok(Self {
      table: Arc::new(DynamoTable::new(&clients)),
      objects: Arc::new(S3ObjectStore::new(&clients, config.s3_bucket.clone())),
      queue: Arc::new(SqsQueue::new(&clients, config)),
      publisher,
      counters: Arc::new(PgGameCounters::new(db_conn)),
    })
  }
}

/// Built once at ignite and kept in managed state.
#[derive(Clone)]
pub struct Services {
  pub ratings: RatingStore,
  pub reviews: ReviewStore,
  pub reconciler: CounterReconciler,
  pub rating_service: RatingService,
  pub uploader: Uploader,
  pub audit: AuditLog,
  pub publisher: Arc<dyn EventPublisher>,
  objects: Arc<dyn ObjectStore>,
  queue: Arc<dyn Queue>,
  image_prefixes: Vec<String>,
  image_max_dimension: u32,
  resized_acl: Option<String>,
  poll_interval: Duration,
}

impl Services {
  pub fn new(config: &Config, backends: Backends) -> Self {
    let ratings = RatingStore::new(backends.table.clone(), config.ratings_table.clone());
    let reviews = ReviewStore::new(backends.table.clone(), config.reviews_table.clone());
    let reconciler = CounterReconciler::new(ratings.clone(), backends.counters);

    Self {
      rating_service: RatingService::new(ratings.clone(), reconciler.clone()),
      uploader: Uploader::new(
        backends.objects.clone(),
        backends.publisher.clone(),
        config.image_prefixes.clone(),
      ),
      audit: AuditLog::new(backends.table, config.audit_table.clone()),
      publisher: backends.publisher,
      objects: backends.objects,
      queue: backends.queue,
      image_prefixes: config.image_prefixes.clone(),
      image_max_dimension: config.image_max_dimension,
      resized_acl: config.resized_acl.clone(),
      poll_interval: Duration::from_secs(config.poll_interval_seconds),
      ratings,
      reviews,
      reconciler,
    }
  }

  pub fn dispatcher(&self) -> Dispatcher {
    Dispatcher::new()
      .register(FileUploadedHandler::new(
        ResizePipeline::new(self.objects.clone(), self.image_max_dimension)
          .with_acl(self.resized_acl.clone()),
        self.image_prefixes.clone(),
      ))
      .register(GameCreatedHandler)
      .register(GameDeletedHandler::new(
        self.ratings.clone(),
        self.reviews.clone(),
      ))
  }

  pub fn worker(&self) -> QueueWorker {
    QueueWorker::new(
      self.queue.clone(),
      self.dispatcher(),
      self.audit.clone(),
      self.poll_interval,
    )
  }
}
