//! Resource slots shared between the fragment program and the bind group.
//!
//! The table is fixed: the pipeline builder wires exactly these five resources
//! into group 0, and [`binding_mismatches`] checks a fragment program's own
//! declarations against it before any GPU work happens.

use wgpu::naga;

/// Bind group index every slot lives in.
pub const PLANET_BIND_GROUP: u32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    UniformBuffer,
    Sampler,
    Texture,
}

impl std::fmt::Display for BindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingKind::UniformBuffer => f.write_str("uniform buffer"),
            BindingKind::Sampler => f.write_str("sampler"),
            BindingKind::Texture => f.write_str("texture"),
        }
    }
}

/// Which loaded resource fills a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotSource {
    Uniforms,
    Day,
    Night,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindingSlot {
    pub binding: u32,
    pub kind: BindingKind,
    pub source: SlotSource,
    pub label: &'static str,
}

pub const PLANET_BINDINGS: [BindingSlot; 5] = [
    BindingSlot {
        binding: 0,
        kind: BindingKind::UniformBuffer,
        source: SlotSource::Uniforms,
        label: "uniforms",
    },
    BindingSlot {
        binding: 1,
        kind: BindingKind::Sampler,
        source: SlotSource::Day,
        label: "day sampler",
    },
    BindingSlot {
        binding: 2,
        kind: BindingKind::Texture,
        source: SlotSource::Day,
        label: "day texture",
    },
    BindingSlot {
        binding: 3,
        kind: BindingKind::Sampler,
        source: SlotSource::Night,
        label: "night sampler",
    },
    BindingSlot {
        binding: 4,
        kind: BindingKind::Texture,
        source: SlotSource::Night,
        label: "night texture",
    },
];

/// A resource declaration found in shader source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclaredBinding {
    pub group: u32,
    pub binding: u32,
    /// `None` for resource types the planet pipeline never binds.
    pub kind: Option<BindingKind>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BindingMismatch {
    #[error("binding {binding} ({expected}) is not declared by the shader")]
    Missing { binding: u32, expected: BindingKind },
    #[error("binding {binding} should be a {expected} but the shader declares {found}")]
    WrongKind {
        binding: u32,
        expected: BindingKind,
        found: String,
    },
    #[error("shader declares unexpected binding {binding} in group {group}")]
    Unexpected { group: u32, binding: u32 },
}

#[derive(Debug, thiserror::Error)]
#[error("failed to parse shader:\n{0}")]
pub struct ReflectError(String);

/// Parses WGSL and lists every bound resource it declares.
pub fn reflect_bindings(source: &str) -> Result<Vec<DeclaredBinding>, ReflectError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|err| ReflectError(err.emit_to_string(source)))?;

    let mut declared: Vec<DeclaredBinding> = module
        .global_variables
        .iter()
        .filter_map(|(_, variable)| {
            let resource = variable.binding.as_ref()?;
            let kind = match module.types[variable.ty].inner {
                naga::TypeInner::Sampler { .. } => Some(BindingKind::Sampler),
                naga::TypeInner::Image { .. } => Some(BindingKind::Texture),
                _ if variable.space == naga::AddressSpace::Uniform => {
                    Some(BindingKind::UniformBuffer)
                }
                _ => None,
            };
            Some(DeclaredBinding {
                group: resource.group,
                binding: resource.binding,
                kind,
                name: variable.name.clone(),
            })
        })
        .collect();
    declared.sort_by_key(|entry| (entry.group, entry.binding));
    Ok(declared)
}

/// Compares shader declarations with [`PLANET_BINDINGS`].
pub fn binding_mismatches(declared: &[DeclaredBinding]) -> Vec<BindingMismatch> {
    let mut mismatches = Vec::new();

    for slot in &PLANET_BINDINGS {
        let found = declared
            .iter()
            .find(|entry| entry.group == PLANET_BIND_GROUP && entry.binding == slot.binding);
        match found {
            None => mismatches.push(BindingMismatch::Missing {
                binding: slot.binding,
                expected: slot.kind,
            }),
            Some(entry) if entry.kind != Some(slot.kind) => {
                mismatches.push(BindingMismatch::WrongKind {
                    binding: slot.binding,
                    expected: slot.kind,
                    found: entry
                        .kind
                        .map(|kind| kind.to_string())
                        .unwrap_or_else(|| "an unsupported resource".to_string()),
                })
            }
            Some(_) => {}
        }
    }

    for entry in declared {
        let known = entry.group == PLANET_BIND_GROUP
            && PLANET_BINDINGS
                .iter()
                .any(|slot| slot.binding == entry.binding);
        if !known {
            mismatches.push(BindingMismatch::Unexpected {
                group: entry.group,
                binding: entry.binding,
            });
        }
    }

    mismatches
}
