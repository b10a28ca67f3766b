pub mod activity;
pub mod links;
pub mod notifications;
pub mod providers;
pub mod recommendations;
pub mod suggest;
pub mod tracker;
