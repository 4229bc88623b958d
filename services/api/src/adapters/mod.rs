pub mod google_places;
pub mod memory;
pub mod openweather;

pub use google_places::GooglePlacesAdapter;
pub use memory::InMemoryPreferenceStore;
pub use openweather::OpenWeatherAdapter;
