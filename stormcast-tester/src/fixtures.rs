use anyhow::{Context, Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

use stormcast_engine::{
    BaseWeather, DataLoader, EngineConfig, KindDefinitions, Location, StaticAssets, WeightTable,
};

/// The nine stock locations with their weather lists.
pub fn vanilla_locations() -> Vec<Location> {
    use BaseWeather::{DustClouds, Eclipsed, Flooded, Foggy, Rainy, Stormy};
    vec![
        Location::new("41 Experimentation", [Rainy, Stormy, Foggy, Flooded, Eclipsed]),
        Location::new("220 Assurance", [Rainy, Stormy, Foggy, Flooded, Eclipsed]),
        Location::new("56 Vow", [Stormy, Foggy, Flooded, Eclipsed]),
        Location::new("71 Gordion", []),
        Location::new("61 March", [Rainy, Stormy, Foggy, Eclipsed]),
        Location::new("20 Adamance", [Rainy, Stormy, Foggy, Flooded, Eclipsed, DustClouds]),
        Location::new("85 Rend", [Stormy, Flooded, Eclipsed, DustClouds]),
        Location::new("7 Dine", [Rainy, Stormy, Flooded, Eclipsed]),
        Location::new("8 Titan", [Stormy, Foggy, Eclipsed]),
    ]
}

/// Stock locations padded with generated ones up to `count`.
pub fn locations(count: usize) -> Vec<Location> {
    let mut all = vanilla_locations();
    let palettes: [&[BaseWeather]; 3] = [
        &[BaseWeather::Rainy, BaseWeather::Foggy, BaseWeather::DustClouds],
        &[BaseWeather::Stormy, BaseWeather::Flooded, BaseWeather::Eclipsed],
        &[BaseWeather::Rainy, BaseWeather::Stormy, BaseWeather::Foggy],
    ];
    let mut index = 0usize;
    while all.len() < count {
        let palette = palettes[index % palettes.len()];
        all.push(Location::new(
            format!("{} Modded", 100 + index),
            palette.iter().copied(),
        ));
        index += 1;
    }
    all.truncate(count);
    all
}

/// Loads engine documents from files, falling back to embedded assets.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    pub weights: Option<PathBuf>,
    pub kinds: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[derive(Debug)]
pub struct LoaderError(Error);

impl std::fmt::Display for LoaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl std::error::Error for LoaderError {}

impl From<Error> for LoaderError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl DataLoader for FileLoader {
    type Error = LoaderError;

    fn load_weight_table(&self) -> Result<WeightTable, Self::Error> {
        let Some(path) = &self.weights else {
            return StaticAssets.load_weight_table().map_err(|err| LoaderError(err.into()));
        };
        WeightTable::from_json(&read(path)?)
            .with_context(|| format!("invalid weight table {}", path.display()))
            .map_err(LoaderError)
    }

    fn load_definitions(&self) -> Result<KindDefinitions, Self::Error> {
        let Some(path) = &self.kinds else {
            return StaticAssets.load_definitions().map_err(|err| LoaderError(err.into()));
        };
        KindDefinitions::from_json(&read(path)?)
            .with_context(|| format!("invalid kind definitions {}", path.display()))
            .map_err(LoaderError)
    }

    fn load_config(&self) -> Result<EngineConfig, Self::Error> {
        let Some(path) = &self.config else {
            return StaticAssets.load_config().map_err(|err| LoaderError(err.into()));
        };
        EngineConfig::from_json(&read(path)?)
            .with_context(|| format!("invalid engine config {}", path.display()))
            .map_err(LoaderError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations_pad_and_truncate() {
        assert_eq!(locations(9), vanilla_locations());
        let many = locations(17);
        assert_eq!(many.len(), 17);
        assert_eq!(many[9].name, "100 Modded");
        assert_eq!(locations(3).len(), 3);
    }

    #[test]
    fn file_loader_falls_back_to_embedded_assets() {
        let loader = FileLoader::default();
        assert_eq!(loader.load_config().unwrap(), EngineConfig::default());
        assert!(!loader.load_definitions().unwrap().combined.is_empty());
    }

    #[test]
    fn file_loader_reports_missing_files() {
        let loader = FileLoader {
            weights: Some(PathBuf::from("/definitely/not/here.json")),
            ..FileLoader::default()
        };
        let err = loader.load_weight_table().unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
