//! Continent → city grouping handed to the template renderer.

use hashbrown::HashSet;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;

use super::Coordinate;

/// Default My Maps placemark style
pub const DEFAULT_COLOUR: &str = "#icon-1899-0288D1-nodesc";

/// Attributes rendered for a single city
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct CityDetails {
    #[serde(rename = "Notes")]
    pub notes: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "Colour")]
    pub colour: String,
}

impl CityDetails {
    pub fn new(notes: &str, coordinate: Coordinate, colour: &str) -> Self {
        Self {
            notes: notes.to_string(),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            colour: colour.to_string(),
        }
    }
}

/// Cities of one continent, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct ContinentGroup {
    pub name: String,
    pub cities: Vec<(String, CityDetails)>,
}

impl ContinentGroup {
    pub fn get(&self, city: &str) -> Option<&CityDetails> {
        self.cities
            .iter()
            .find(|(name, _)| name == city)
            .map(|(_, details)| details)
    }

    pub fn city_names(&self) -> impl Iterator<Item = &str> {
        self.cities.iter().map(|(name, _)| name.as_str())
    }
}

/// Two-level mapping continent → city → details.
///
/// Both levels keep insertion order. A `(continent, city)` pair is stored
/// once; later inserts for the same pair are ignored.
#[derive(Debug, Clone, Default)]
pub struct GroupedMap {
    continents: Vec<ContinentGroup>,
    seen: HashSet<(String, String)>,
}

impl GroupedMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert details for a city. Returns `false` if the pair was already present.
    pub fn insert(&mut self, continent: &str, city: &str, details: CityDetails) -> bool {
        if !self.seen.insert((continent.to_string(), city.to_string())) {
            return false;
        }

        let group = match self.continents.iter().position(|g| g.name == continent) {
            Some(idx) => &mut self.continents[idx],
            None => {
                self.continents.push(ContinentGroup {
                    name: continent.to_string(),
                    cities: Vec::new(),
                });
                let last = self.continents.len() - 1;
                &mut self.continents[last]
            }
        };
        group.cities.push((city.to_string(), details));
        true
    }

    pub fn contains(&self, continent: &str, city: &str) -> bool {
        self.get(continent, city).is_some()
    }

    pub fn get(&self, continent: &str, city: &str) -> Option<&CityDetails> {
        self.continent(continent).and_then(|g| g.get(city))
    }

    pub fn continent(&self, name: &str) -> Option<&ContinentGroup> {
        self.continents.iter().find(|g| g.name == name)
    }

    pub fn continents(&self) -> &[ContinentGroup] {
        &self.continents
    }

    pub fn continent_names(&self) -> impl Iterator<Item = &str> {
        self.continents.iter().map(|g| g.name.as_str())
    }

    /// Number of placemarks across all continents
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

struct CitiesRef<'a>(&'a [(String, CityDetails)]);

impl Serialize for CitiesRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (city, details) in self.0 {
            map.serialize_entry(city, details)?;
        }
        map.end()
    }
}

impl Serialize for GroupedMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.continents.len()))?;
        for group in &self.continents {
            map.serialize_entry(&group.name, &CitiesRef(&group.cities))?;
        }
        map.end()
    }
}

struct CitiesVisitor;

impl<'de> Visitor<'de> for CitiesVisitor {
    type Value = Vec<(String, CityDetails)>;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a map of city name to details")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut cities = Vec::new();
        while let Some(entry) = access.next_entry::<String, CityDetails>()? {
            cities.push(entry);
        }
        Ok(cities)
    }
}

struct Cities(Vec<(String, CityDetails)>);

impl<'de> Deserialize<'de> for Cities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CitiesVisitor).map(Cities)
    }
}

struct GroupedMapVisitor;

impl<'de> Visitor<'de> for GroupedMapVisitor {
    type Value = GroupedMap;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a map of continent name to cities")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = GroupedMap::new();
        while let Some((continent, Cities(cities))) = access.next_entry::<String, Cities>()? {
            for (city, details) in cities {
                map.insert(&continent, &city, details);
            }
        }
        Ok(map)
    }
}

/// Reads the nested mapping back in document order
impl<'de> Deserialize<'de> for GroupedMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(GroupedMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(notes: &str, lat: f64, lon: f64) -> CityDetails {
        CityDetails::new(notes, Coordinate::new(lat, lon), DEFAULT_COLOUR)
    }

    #[test]
    fn test_first_insert_wins() {
        let mut map = GroupedMap::new();
        assert!(map.insert("Europe", "Vienna", details("first", 1.0, 2.0)));
        assert!(!map.insert("Europe", "Vienna", details("second", 3.0, 4.0)));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("Europe", "Vienna").unwrap().notes, "first");
    }

    #[test]
    fn test_same_city_under_different_continents() {
        let mut map = GroupedMap::new();
        map.insert("Europe", "Istanbul", details("", 41.0, 28.9));
        map.insert("Asia", "Istanbul", details("", 41.0, 28.9));
        assert_eq!(map.len(), 2);
        assert!(map.contains("Asia", "Istanbul"));
        assert!(map.contains("Europe", "Istanbul"));
        assert!(!map.contains("Africa", "Istanbul"));
        assert!(!map.contains("Asia", "Ankara"));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut map = GroupedMap::new();
        map.insert("Europe", "Vienna", details("", 0.0, 0.0));
        map.insert("Asia", "Abu Dhabi", details("", 0.0, 0.0));
        map.insert("Europe", "Innsbruck", details("", 0.0, 0.0));
        map.insert("Africa", "Cairo", details("", 0.0, 0.0));

        let continents: Vec<&str> = map.continent_names().collect();
        assert_eq!(continents, vec!["Europe", "Asia", "Africa"]);

        let europe: Vec<&str> = map.continent("Europe").unwrap().city_names().collect();
        assert_eq!(europe, vec!["Vienna", "Innsbruck"]);
    }

    #[test]
    fn test_serializes_in_insertion_order() {
        let mut map = GroupedMap::new();
        map.insert("Europe", "Vienna", details("", 48.2083537, 16.3725042));
        map.insert("Asia", "Abu Dhabi", details("beach", 24.4538352, 54.3774014));

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(
            json,
            concat!(
                r##"{"Europe":{"Vienna":{"Notes":"","latitude":48.2083537,"longitude":16.3725042,"Colour":"#icon-1899-0288D1-nodesc"}},"##,
                r##""Asia":{"Abu Dhabi":{"Notes":"beach","latitude":24.4538352,"longitude":54.3774014,"Colour":"#icon-1899-0288D1-nodesc"}}}"##
            )
        );
    }

    #[test]
    fn test_deserializes_in_document_order() {
        let map: GroupedMap = serde_json::from_str(
            r##"{"Europe":{"Vienna":{"Notes":"","latitude":48.2,"longitude":16.3,"Colour":"#icon"},
                 "Ghent":{"Notes":"canals","latitude":51.0,"longitude":3.7,"Colour":"#icon"}},
                "Asia":{"Abu Dhabi":{"Notes":"","latitude":24.4,"longitude":54.3,"Colour":"#icon"}}}"##,
        )
        .unwrap();

        let continents: Vec<&str> = map.continent_names().collect();
        assert_eq!(continents, vec!["Europe", "Asia"]);
        let europe: Vec<&str> = map.continent("Europe").unwrap().city_names().collect();
        assert_eq!(europe, vec!["Vienna", "Ghent"]);
        assert_eq!(map.get("Europe", "Ghent").unwrap().notes, "canals");
        assert_eq!(map.len(), 3);
    }
}
