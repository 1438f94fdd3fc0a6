use serde::{Deserialize, Serialize};

const EMBEDDED_CITIES: &str = include_str!("../data/cities.json");
const SEARCH_MIN_CHARS: usize = 2;
const SEARCH_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: i32,
    pub name: String,
    pub region: String,
    pub population: i64,
}

/// City as embedded in profile views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityRef {
    pub id: i32,
    pub name: String,
    pub region: String,
}

impl From<&City> for CityRef {
    fn from(city: &City) -> Self {
        Self { id: city.id, name: city.name.clone(), region: city.region.clone() }
    }
}

/// Immutable city reference data, ordered by population descending.
#[derive(Debug, Clone)]
pub struct CityDirectory {
    cities: Vec<City>,
}

impl CityDirectory {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let cities: Vec<City> = serde_json::from_str(json)?;
        Ok(Self::new(cities))
    }

    /// The dataset compiled into the binary.
    pub fn embedded() -> Result<Self, serde_json::Error> {
        Self::from_json(EMBEDDED_CITIES)
    }

    pub fn new(mut cities: Vec<City>) -> Self {
        cities.sort_by(|a, b| b.population.cmp(&a.population).then(a.id.cmp(&b.id)));
        Self { cities }
    }

    pub fn get(&self, id: i32) -> Option<&City> {
        self.cities.iter().find(|c| c.id == id)
    }

    pub fn city_ref(&self, id: i32) -> Option<CityRef> {
        self.get(id).map(CityRef::from)
    }

    pub fn contains(&self, id: i32) -> bool {
        self.get(id).is_some()
    }

    pub fn all(&self) -> &[City] {
        &self.cities
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Case-insensitive substring match on the name. Queries shorter than two
    /// characters return the whole list.
    pub fn search(&self, query: &str) -> Vec<City> {
        let query = query.trim();
        if query.chars().count() < SEARCH_MIN_CHARS {
            return self.cities.clone();
        }

        let needle = query.to_lowercase();
        self.cities
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .take(SEARCH_LIMIT)
            .cloned()
            .collect()
    }
}
