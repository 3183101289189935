/// Router Module Index
///
/// Organizes the application's routing into one module per resource, the way
/// the HTTP surface is carved up: identity routes, campground routes, and the
/// review routes nested inside a campground's identity space. Authentication
/// and ownership are enforced per handler by the extractor/guard chain, so a
/// route's access requirements live next to its logic rather than in a
/// blanket layer.

/// Identity routes: registration, login, logout.
pub mod users;

/// Campground collection and member routes.
pub mod campgrounds;

/// Review routes, mounted under `/campgrounds/{id}/reviews`. A review id is
/// only addressable through its parent campground's path.
pub mod reviews;
