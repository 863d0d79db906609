//! Resource kinds and their field schemas.
//!
//! Every entity served under `/api/<plural>` is described here once. The
//! validator, the controller, the stores and the route table all read from
//! this catalogue, so adding an entity means adding a variant and a schema.

use std::fmt;

/// Type of a single schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Trimmed, non-empty string of at most 255 characters.
    Text,
    /// Text that must look like an email address.
    Email,
    /// Plaintext password; hashed before it reaches the store.
    Password,
    /// Finite, non-negative JSON number.
    Number,
    /// JSON boolean.
    Boolean,
    /// Positive integer id of another resource.
    Reference(ResourceKind),
    /// One of a fixed set of strings.
    OneOf(&'static [&'static str]),
}

/// One field of a resource schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Wire name (camelCase).
    pub name: &'static str,
    pub kind: FieldKind,
    /// Must be present on create.
    pub required: bool,
    /// No two records of the kind may share a value.
    pub unique: bool,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: false,
        unique: false,
    }
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: true,
        unique: false,
    }
}

const fn required_unique(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: true,
        unique: true,
    }
}

/// Roles a user record may carry.
pub const USER_ROLES: &[&str] = &["user", "admin"];

const ASTEROID: &[FieldSpec] = &[
    required("name", FieldKind::Text),
    field("size", FieldKind::Number),
    field("composition", FieldKind::Text),
    field("orbitalPeriod", FieldKind::Number),
    field("galaxyId", FieldKind::Reference(ResourceKind::Galaxy)),
];

const COMET: &[FieldSpec] = &[
    required("name", FieldKind::Text),
    field("orbitalPeriod", FieldKind::Number),
    field("lastPerihelion", FieldKind::Text),
    field("galaxyId", FieldKind::Reference(ResourceKind::Galaxy)),
];

const CONSTELLATION: &[FieldSpec] = &[
    required("name", FieldKind::Text),
    field("abbreviation", FieldKind::Text),
    field("hemisphere", FieldKind::Text),
    field("brightestStar", FieldKind::Text),
];

const GALAXY: &[FieldSpec] = &[
    required("name", FieldKind::Text),
    required("type", FieldKind::Text),
    field("distance", FieldKind::Number),
    field("size", FieldKind::Number),
];

const MOON: &[FieldSpec] = &[
    required("name", FieldKind::Text),
    field("diameter", FieldKind::Number),
    field("orbitalPeriod", FieldKind::Number),
    required("planetId", FieldKind::Reference(ResourceKind::Planet)),
];

const NEBULA: &[FieldSpec] = &[
    required("name", FieldKind::Text),
    field("type", FieldKind::Text),
    field("distance", FieldKind::Number),
    field("galaxyId", FieldKind::Reference(ResourceKind::Galaxy)),
];

const PLANET: &[FieldSpec] = &[
    required("name", FieldKind::Text),
    field("mass", FieldKind::Number),
    field("radius", FieldKind::Number),
    field("orbitalPeriod", FieldKind::Number),
    field("hasRings", FieldKind::Boolean),
    field("starId", FieldKind::Reference(ResourceKind::Star)),
];

const STAR: &[FieldSpec] = &[
    required("name", FieldKind::Text),
    field("spectralType", FieldKind::Text),
    field("mass", FieldKind::Number),
    field("luminosity", FieldKind::Number),
    field("galaxyId", FieldKind::Reference(ResourceKind::Galaxy)),
    field("constellationId", FieldKind::Reference(ResourceKind::Constellation)),
];

const USER: &[FieldSpec] = &[
    required_unique("username", FieldKind::Text),
    required_unique("email", FieldKind::Email),
    required("password", FieldKind::Password),
    field("role", FieldKind::OneOf(USER_ROLES)),
    field("planetId", FieldKind::Reference(ResourceKind::Planet)),
];

/// Entities exposed through the CRUD routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Asteroid,
    Comet,
    Constellation,
    Galaxy,
    Moon,
    Nebula,
    Planet,
    Star,
    User,
}

impl ResourceKind {
    /// Every kind, in mount order.
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Asteroid,
        ResourceKind::Comet,
        ResourceKind::Constellation,
        ResourceKind::Galaxy,
        ResourceKind::Moon,
        ResourceKind::Nebula,
        ResourceKind::Planet,
        ResourceKind::Star,
        ResourceKind::User,
    ];

    /// Capitalised name used in response messages ("Asteroid").
    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::Asteroid => "Asteroid",
            ResourceKind::Comet => "Comet",
            ResourceKind::Constellation => "Constellation",
            ResourceKind::Galaxy => "Galaxy",
            ResourceKind::Moon => "Moon",
            ResourceKind::Nebula => "Nebula",
            ResourceKind::Planet => "Planet",
            ResourceKind::Star => "Star",
            ResourceKind::User => "User",
        }
    }

    /// URL segment and table name ("asteroids").
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Asteroid => "asteroids",
            ResourceKind::Comet => "comets",
            ResourceKind::Constellation => "constellations",
            ResourceKind::Galaxy => "galaxies",
            ResourceKind::Moon => "moons",
            ResourceKind::Nebula => "nebulae",
            ResourceKind::Planet => "planets",
            ResourceKind::Star => "stars",
            ResourceKind::User => "users",
        }
    }

    /// Look a kind up by its URL segment.
    pub fn from_plural(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.plural() == segment)
    }

    /// Field schema for this kind, in validation order.
    pub fn schema(&self) -> &'static [FieldSpec] {
        match self {
            ResourceKind::Asteroid => ASTEROID,
            ResourceKind::Comet => COMET,
            ResourceKind::Constellation => CONSTELLATION,
            ResourceKind::Galaxy => GALAXY,
            ResourceKind::Moon => MOON,
            ResourceKind::Nebula => NEBULA,
            ResourceKind::Planet => PLANET,
            ResourceKind::Star => STAR,
            ResourceKind::User => USER,
        }
    }

    /// Look up one field by wire name.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.schema().iter().find(|spec| spec.name == name)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}
