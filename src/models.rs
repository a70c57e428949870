mod game;
mod rating;
mod review;

pub use game::Game;
pub use rating::{game_partition, user_partition, Rating, RatingType};
pub use review::Review;
