//! Template rendering of the grouped map into the output file.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use minijinja::{context, Environment};
use tracing::{debug, info, warn};

use crate::error::RenderError;
use crate::models::GroupedMap;

pub const DEFAULT_TEMPLATE_PATH: &str = "kml_maps.jinja2";
pub const DEFAULT_OUTPUT_PATH: &str = "map_file_jk.kml";

/// Name under which the grouped map is exposed to templates
pub const MAP_DATA_KEY: &str = "map_data";

const BUILTIN_TEMPLATE: &str = include_str!("../../templates/kml_maps.jinja2");
const BUILTIN_NAME: &str = "kml_maps.jinja2";

/// A loaded Jinja template ready to render [`GroupedMap`]s
pub struct TemplateRenderer {
    env: Environment<'static>,
    name: String,
    undeclared: HashSet<String>,
}

impl TemplateRenderer {
    /// Load a template from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| RenderError::ReadTemplate {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(BUILTIN_NAME)
            .to_string();

        info!("Loaded template {}", path.display());
        Self::from_source(name, source)
    }

    /// The bundled KML template for Google My Maps
    pub fn builtin() -> Result<Self, RenderError> {
        Self::from_source(BUILTIN_NAME.to_string(), BUILTIN_TEMPLATE.to_string())
    }

    pub fn from_source(name: String, source: String) -> Result<Self, RenderError> {
        let mut env = Environment::new();
        // Python-style `dict.items()` etc. for templates written against Jinja2
        env.set_unknown_method_callback(minijinja_contrib::pycompat::unknown_method_callback);
        env.add_template_owned(name.clone(), source)?;

        let undeclared = env.get_template(&name)?.undeclared_variables(false);
        let unknown: Vec<&String> = undeclared
            .iter()
            .filter(|v| v.as_str() != MAP_DATA_KEY)
            .collect();
        if !unknown.is_empty() {
            warn!(
                "Template {} uses variables that will be undefined: {:?}",
                name, unknown
            );
        }
        if !undeclared.contains(MAP_DATA_KEY) {
            warn!("Template {} never references '{}'", name, MAP_DATA_KEY);
        }

        Ok(Self {
            env,
            name,
            undeclared,
        })
    }

    /// Top-level variables the template reads
    pub fn undeclared_variables(&self) -> &HashSet<String> {
        &self.undeclared
    }

    /// Render the map, exposed to the template as `map_data`
    pub fn render(&self, map: &GroupedMap) -> Result<String, RenderError> {
        let template = self.env.get_template(&self.name)?;
        Ok(template.render(context! { map_data => map })?)
    }

    /// Render the map and write it to `output`, creating parent directories
    pub fn render_to_file<P: AsRef<Path>>(&self, map: &GroupedMap, output: P) -> Result<(), RenderError> {
        let output = output.as_ref();
        let rendered = self.render(map)?;
        write_output(output, rendered.as_bytes())?;
        info!("Wrote {} placemarks to {}", map.len(), output.display());
        Ok(())
    }
}

/// Write the grouped map as pretty JSON
pub fn write_json<P: AsRef<Path>>(map: &GroupedMap, output: P) -> Result<(), RenderError> {
    let output = output.as_ref();
    let json = serde_json::to_string_pretty(map)?;
    write_output(output, json.as_bytes())?;
    info!("Wrote map data to {}", output.display());
    Ok(())
}

/// Read grouped map data previously written by [`write_json`]
pub fn read_json<P: AsRef<Path>>(path: P) -> Result<GroupedMap, RenderError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| RenderError::ReadJson {
        path: path.to_path_buf(),
        source,
    })?;
    let map: GroupedMap = serde_json::from_str(&content)?;
    info!("Read {} placemarks from {}", map.len(), path.display());
    Ok(map)
}

fn write_output(output: &Path, content: &[u8]) -> Result<(), RenderError> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating output directory {}", parent.display());
            fs::create_dir_all(parent).map_err(|source| RenderError::OutputDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    fs::write(output, content).map_err(|source| RenderError::Write {
        path: output.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{records_from_reader, Aggregator};
    use crate::coordinates::CoordinateService;
    use crate::geocode::stub::StubGeocoder;
    use crate::models::{CityDetails, Coordinate, DEFAULT_COLOUR};
    use crate::store::CoordinateStore;
    use tempfile::TempDir;

    const FOLDER_TEMPLATE: &str = "{% for continent, cities in map_data.items() %}\
<Folder><name>{{ continent }}</name>\
{% for city, details in cities.items() %}\
<Placemark><name>{{ city }}</name><description>{{ details.Notes }}</description>\
<coordinates>{{ details.longitude }},{{ details.latitude }}</coordinates></Placemark>\
{% endfor %}</Folder>{% endfor %}";

    fn sample_map() -> GroupedMap {
        let mut map = GroupedMap::new();
        map.insert(
            "Europe",
            "Vienna",
            CityDetails::new("", Coordinate::new(48.2083537, 16.3725042), DEFAULT_COLOUR),
        );
        map.insert(
            "Asia",
            "Abu Dhabi",
            CityDetails::new("Louvre", Coordinate::new(24.4538352, 54.3774014), DEFAULT_COLOUR),
        );
        map
    }

    #[test]
    fn test_render_python_style_items() {
        let renderer =
            TemplateRenderer::from_source("folders".to_string(), FOLDER_TEMPLATE.to_string())
                .unwrap();
        let out = renderer.render(&sample_map()).unwrap();
        assert_eq!(
            out,
            "<Folder><name>Europe</name>\
<Placemark><name>Vienna</name><description></description>\
<coordinates>16.3725042,48.2083537</coordinates></Placemark></Folder>\
<Folder><name>Asia</name>\
<Placemark><name>Abu Dhabi</name><description>Louvre</description>\
<coordinates>54.3774014,24.4538352</coordinates></Placemark></Folder>"
        );
    }

    #[test]
    fn test_undeclared_variables() {
        let renderer = TemplateRenderer::from_source(
            "t".to_string(),
            "{{ title }}{% for c in map_data %}{{ c }}{% endfor %}".to_string(),
        )
        .unwrap();
        assert!(renderer.undeclared_variables().contains("map_data"));
        assert!(renderer.undeclared_variables().contains("title"));
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let result = TemplateRenderer::from_source("bad".to_string(), "{% for %}".to_string());
        assert!(matches!(result, Err(RenderError::Template(_))));
    }

    #[test]
    fn test_builtin_template_renders_kml() {
        let renderer = TemplateRenderer::builtin().unwrap();
        let out = renderer.render(&sample_map()).unwrap();

        assert!(out.starts_with("<?xml"));
        assert!(out.contains("<name>Europe</name>"));
        assert!(out.contains("<coordinates>16.3725042,48.2083537,0</coordinates>"));
        assert!(out.contains("<styleUrl>#icon-1899-0288D1-nodesc</styleUrl>"));
        assert!(out.find("Vienna").unwrap() < out.find("Abu Dhabi").unwrap());
    }

    #[test]
    fn test_render_creates_output_folder() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("output_folder/nested/map.kml");
        let renderer = TemplateRenderer::builtin().unwrap();

        renderer.render_to_file(&sample_map(), &output).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn test_render_into_existing_folder() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("map.kml");
        let renderer = TemplateRenderer::builtin().unwrap();

        renderer.render_to_file(&sample_map(), &output).unwrap();
        assert!(fs::read_to_string(&output).unwrap().contains("Abu Dhabi"));
    }

    #[test]
    fn test_output_dir_blocked_by_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("blocker"), "").unwrap();
        let output = dir.path().join("blocker/sub/map.kml");

        let result = TemplateRenderer::builtin()
            .unwrap()
            .render_to_file(&sample_map(), &output);
        assert!(matches!(result, Err(RenderError::OutputDir { .. })));
    }

    #[test]
    fn test_write_json() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("map.json");
        write_json(&sample_map(), &output).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(value["Asia"]["Abu Dhabi"]["Notes"], "Louvre");
    }

    #[test]
    fn test_json_written_then_read_back() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("data/map.json");
        write_json(&sample_map(), &output).unwrap();

        let map = read_json(&output).unwrap();
        let continents: Vec<&str> = map.continent_names().collect();
        assert_eq!(continents, vec!["Europe", "Asia"]);
        assert_eq!(map.get("Asia", "Abu Dhabi"), sample_map().get("Asia", "Abu Dhabi"));
    }

    #[test]
    fn test_read_json_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = read_json(dir.path().join("absent.json"));
        assert!(matches!(result, Err(RenderError::ReadJson { .. })));
    }

    #[tokio::test]
    async fn test_end_to_end_from_csv() {
        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("city_country_data_base.csv");
        fs::write(
            &store_path,
            "Vienna,Austria,Europe,48.2083537,16.3725042\n\
             Innsbruck,Austria,Europe,47.2654296,11.3927685\n",
        )
        .unwrap();

        let records = records_from_reader(
            "City,Country,Continent,Notes\n\
             Vienna,Austria,Europe,\n\
             Innsbruck,Austria,Europe,\n\
             Abu Dhabi,UAE,Asia,\n"
                .as_bytes(),
        );
        let geocoder =
            StubGeocoder::new().with("Abu Dhabi, UAE", Coordinate::new(24.4538352, 54.3774014));
        let mut aggregator =
            Aggregator::new(CoordinateService::new(CoordinateStore::new(&store_path), geocoder));

        let map = aggregator.build_grouped_map(&records).await.unwrap();
        let output = dir.path().join("output/map_file_jk.kml");
        TemplateRenderer::from_source("folders".to_string(), FOLDER_TEMPLATE.to_string())
            .unwrap()
            .render_to_file(&map, &output)
            .unwrap();

        let kml = fs::read_to_string(&output).unwrap();
        assert!(kml.contains("<Folder><name>Asia</name>"));
        assert_eq!(aggregator.service().geocoder().queries(), vec!["Abu Dhabi, UAE"]);
        assert_eq!(
            fs::read_to_string(&store_path).unwrap().lines().count(),
            3
        );
    }
}
