use crate::schema::games;
use diesel::dsl::Find;
use diesel::prelude::*;

#[derive(Queryable, Identifiable, Clone, Debug)]
pub struct Game {
  pub id: String,
  pub title: String,
  pub likes: i32,
  pub dislikes: i32,
  pub created_at: chrono::NaiveDateTime,
  pub updated_at: chrono::NaiveDateTime,
}

impl Game {
  pub fn find_by_id(id: &str) -> Find<games::table, String> {
    games::table.find(id.to_owned())
  }
}
