//! Contact materials and the registry the solver consults during contact resolution

use std::collections::HashMap;
use tracing::{debug, warn};

/// Friction/restitution profile for a physics shape
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialPreset {
    /// Friction coefficient (0.0 = frictionless)
    pub friction: f32,
    /// Restitution/bounciness (0.0 = no bounce, 1.0 = perfect bounce)
    pub restitution: f32,
}

impl MaterialPreset {
    pub fn new(friction: f32, restitution: f32) -> Self {
        Self {
            friction,
            restitution,
        }
    }

    /// Road surface
    pub fn ground() -> Self {
        Self::new(0.8, 0.1)
    }

    /// Tire rubber - high grip, some bounce
    pub fn tire() -> Self {
        Self::new(1.2, 0.3)
    }

    /// Painted body panels and structural nodes
    pub fn vehicle_body() -> Self {
        Self::new(0.4, 0.2)
    }

    /// Metal obstacles (barriers, poles)
    pub fn metal() -> Self {
        Self::new(0.5, 0.3)
    }

    /// Ice - very low friction, low bounce
    pub fn ice() -> Self {
        Self::new(0.05, 0.1)
    }

    /// Concrete - rough, no bounce
    pub fn concrete() -> Self {
        Self::new(0.9, 0.0)
    }
}

impl Default for MaterialPreset {
    fn default() -> Self {
        Self::ground()
    }
}

/// Opaque handle to a registered material
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialHandle(u32);

impl MaterialHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Encode into collider user data. Zero is reserved for "no material".
    pub fn to_user_data(self) -> u128 {
        self.0 as u128 + 1
    }

    pub fn from_user_data(data: u128) -> Option<Self> {
        if data == 0 || data > u32::MAX as u128 {
            return None;
        }
        Some(Self((data - 1) as u32))
    }
}

/// A named material, immutable once registered
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialRecord {
    pub name: String,
    pub friction: f32,
    pub restitution: f32,
}

/// Explicit coefficients for contacts between two specific materials
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactPairRecord {
    pub material_a: MaterialHandle,
    pub material_b: MaterialHandle,
    pub friction: f32,
    pub restitution: f32,
}

/// Coefficients the solver should use for one contact
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactProperties {
    pub friction: f32,
    pub restitution: f32,
}

/// Owns every material and contact-pair record of a simulation session.
///
/// Records are never removed. Lookups by handle and by handle pair are O(1).
#[derive(Debug, Default, Clone)]
pub struct ContactMaterialRegistry {
    materials: Vec<MaterialRecord>,
    by_name: HashMap<String, MaterialHandle>,
    pairs: HashMap<(MaterialHandle, MaterialHandle), ContactPairRecord>,
}

impl ContactMaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the road, tire, body and metal materials
    /// and their contact pairs
    pub fn driving() -> Self {
        let mut registry = Self::new();
        let ground = registry.register_preset("ground", MaterialPreset::ground());
        let tire = registry.register_preset("tire", MaterialPreset::tire());
        let body = registry.register_preset("vehicle_body", MaterialPreset::vehicle_body());
        let metal = registry.register_preset("metal", MaterialPreset::metal());

        registry.register_contact_pair(tire, ground, 1.0, 0.1);
        registry.register_contact_pair(body, ground, 0.4, 0.2);
        registry.register_contact_pair(body, metal, 0.3, 0.4);
        registry
    }

    /// Register a named material. Re-registering a name points the name at
    /// the new record; handles to the old record stay valid.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        friction: f32,
        restitution: f32,
    ) -> MaterialHandle {
        let name = name.into();
        let handle = MaterialHandle(self.materials.len() as u32);

        if self.by_name.contains_key(&name) {
            warn!("Material '{}' registered twice; name now refers to {:?}", name, handle);
        }
        debug!(
            "Registered material '{}' (friction={}, restitution={}) as {:?}",
            name, friction, restitution, handle
        );

        self.by_name.insert(name.clone(), handle);
        self.materials.push(MaterialRecord {
            name,
            friction,
            restitution,
        });
        handle
    }

    pub fn register_preset(
        &mut self,
        name: impl Into<String>,
        preset: MaterialPreset,
    ) -> MaterialHandle {
        self.register(name, preset.friction, preset.restitution)
    }

    /// Override the coefficients used when `material_a` touches `material_b`.
    /// The pair is unordered.
    pub fn register_contact_pair(
        &mut self,
        material_a: MaterialHandle,
        material_b: MaterialHandle,
        friction: f32,
        restitution: f32,
    ) {
        let record = ContactPairRecord {
            material_a,
            material_b,
            friction,
            restitution,
        };
        self.pairs.insert(Self::pair_key(material_a, material_b), record);
    }

    pub fn get(&self, handle: MaterialHandle) -> Option<&MaterialRecord> {
        self.materials.get(handle.index())
    }

    pub fn handle_by_name(&self, name: &str) -> Option<MaterialHandle> {
        self.by_name.get(name).copied()
    }

    pub fn contact_pair(&self, a: MaterialHandle, b: MaterialHandle) -> Option<&ContactPairRecord> {
        self.pairs.get(&Self::pair_key(a, b))
    }

    /// Effective coefficients for a contact between two materials.
    ///
    /// An explicit pair wins. Otherwise friction is the geometric mean and
    /// restitution the larger of the two. `None` if either handle is unknown.
    pub fn contact_properties(
        &self,
        a: MaterialHandle,
        b: MaterialHandle,
    ) -> Option<ContactProperties> {
        if let Some(pair) = self.contact_pair(a, b) {
            return Some(ContactProperties {
                friction: pair.friction,
                restitution: pair.restitution,
            });
        }

        let ma = self.get(a)?;
        let mb = self.get(b)?;
        Some(ContactProperties {
            friction: (ma.friction * mb.friction).max(0.0).sqrt(),
            restitution: ma.restitution.max(mb.restitution),
        })
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    fn pair_key(a: MaterialHandle, b: MaterialHandle) -> (MaterialHandle, MaterialHandle) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}
