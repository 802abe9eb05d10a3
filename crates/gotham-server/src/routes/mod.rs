pub mod celebrations;
pub mod devices;
pub mod health;
pub mod light;
pub mod milestones;
pub mod patterns;
pub mod webhooks;
pub mod youtube;
