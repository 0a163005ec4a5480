// Domain entities - states and cities keyed by natural code
//
// Both entities keep their fields private: identity (the code) is immutable
// once created, and every mutation goes through a validated update method.

pub mod city;
pub mod state;

pub use city::City;
pub use state::State;
