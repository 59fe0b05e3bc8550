//! Structure families and the generator entry point.

use crate::config::GenerationConfig;
use crate::end_city::EndCityGenerator;
use crate::mineshaft::MineshaftGenerator;
use crate::ocean_monument::OceanMonumentGenerator;
use crate::record::DecodeError;
use crate::stronghold::StrongholdGenerator;
use crate::structure_start::StructureStart;
use crate::structure_template::TemplateLibrary;
use crate::woodland_mansion::WoodlandMansionGenerator;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use structgen_core::{structure_rng, ChunkPos, RandomSource};
use tracing::{debug, instrument};

/// Structure families the layout generators know how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StructureFamily {
    Mineshaft,
    Stronghold,
    OceanMonument,
    EndCity,
    WoodlandMansion,
}

impl StructureFamily {
    pub const ALL: [StructureFamily; 5] = [
        StructureFamily::Mineshaft,
        StructureFamily::Stronghold,
        StructureFamily::OceanMonument,
        StructureFamily::EndCity,
        StructureFamily::WoodlandMansion,
    ];

    /// Persisted structure id.
    pub const fn id(self) -> &'static str {
        match self {
            StructureFamily::Mineshaft => "Mineshaft",
            StructureFamily::Stronghold => "Stronghold",
            StructureFamily::OceanMonument => "Monument",
            StructureFamily::EndCity => "EndCity",
            StructureFamily::WoodlandMansion => "Mansion",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|family| family.id() == id)
    }

    /// Lowercase name used on the command line and in file names.
    pub const fn name(self) -> &'static str {
        match self {
            StructureFamily::Mineshaft => "mineshaft",
            StructureFamily::Stronghold => "stronghold",
            StructureFamily::OceanMonument => "ocean_monument",
            StructureFamily::EndCity => "end_city",
            StructureFamily::WoodlandMansion => "woodland_mansion",
        }
    }

    /// Seed salt keeping each family's layout stream independent.
    pub const fn salt(self) -> u64 {
        match self {
            StructureFamily::Mineshaft => 0x4D49_4E45,
            StructureFamily::Stronghold => 0x5354_524F,
            StructureFamily::OceanMonument => 0x4D4F_4E55,
            StructureFamily::EndCity => 0x454E_4443,
            StructureFamily::WoodlandMansion => 0x4D41_4E53,
        }
    }
}

impl fmt::Display for StructureFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StructureFamily {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|family| family.name() == s || family.id() == s)
            .ok_or_else(|| DecodeError::UnknownStructure(s.to_string()))
    }
}

/// Lays out one structure family.
pub trait StructureGenerator {
    fn family(&self) -> StructureFamily;

    /// Build a structure started at `chunk`.
    ///
    /// `None` means no structure could be placed at this origin; retrying
    /// elsewhere is up to the caller.
    fn generate(&self, chunk: ChunkPos, rng: &mut dyn RandomSource) -> Option<StructureStart>;
}

/// Generator for `family` configured from `config`.
pub fn generator_for(
    family: StructureFamily,
    config: &GenerationConfig,
    templates: Arc<dyn TemplateLibrary>,
) -> Box<dyn StructureGenerator> {
    match family {
        StructureFamily::Mineshaft => Box::new(MineshaftGenerator::new(config)),
        StructureFamily::Stronghold => Box::new(StrongholdGenerator::new(config)),
        StructureFamily::OceanMonument => {
            Box::new(OceanMonumentGenerator::new(&config.ocean_monument))
        }
        StructureFamily::EndCity => Box::new(EndCityGenerator::new(&config.end_city, templates)),
        StructureFamily::WoodlandMansion => Box::new(WoodlandMansionGenerator::new(
            &config.woodland_mansion,
            templates,
        )),
    }
}

/// Lay out `family` at `chunk` with the layout stream derived from `world_seed`.
#[instrument(skip(config, templates), fields(family = %family))]
pub fn generate_structure(
    family: StructureFamily,
    config: &GenerationConfig,
    templates: Arc<dyn TemplateLibrary>,
    world_seed: u64,
    chunk: ChunkPos,
) -> Option<StructureStart> {
    let generator = generator_for(family, config, templates);
    let mut rng = structure_rng(world_seed, chunk, family.salt());
    let start = generator.generate(chunk, &mut rng);
    match &start {
        Some(start) => debug!(
            pieces = start.pieces().len(),
            bounds = %start.bounding_box(),
            "generated structure"
        ),
        None => debug!("no structure at origin"),
    }
    start
}
