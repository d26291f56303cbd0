//! Layout computation: names, sizes and offsets of every payload.

use std::{
  collections::{hash_map, HashMap},
  path::{Path, PathBuf},
};

use crate::{
  align::OffsetAllocator,
  error::{Error, Result},
  naming::{NameClassifier, DEFAULT_PRESERVED_EXTENSIONS},
  reader::Image,
  spec::{self, DirectoryEntry, EntryName, ImageDirectory},
};

pub struct PlannerOptions {
  /// Extensions (without the dot, any case) kept in display names.
  pub preserved_extensions: Vec<String>,
}

impl Default for PlannerOptions {
  fn default() -> Self {
    Self {
      preserved_extensions: DEFAULT_PRESERVED_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect(),
    }
  }
}

/// A payload with its final position in the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDescriptor {
  display_name: String,
  name: EntryName,
  size: u32,
  offset: u32,
  source: PathBuf,
}

impl PayloadDescriptor {
  /// Name as derived from the path, before truncation.
  pub fn display_name(&self) -> &str {
    &self.display_name
  }

  /// Name as stored in the directory.
  pub fn name(&self) -> &EntryName {
    &self.name
  }

  pub fn size(&self) -> u32 {
    self.size
  }

  pub fn offset(&self) -> u32 {
    self.offset
  }

  pub fn source(&self) -> &Path {
    &self.source
  }

  pub fn is_truncated(&self) -> bool {
    self.display_name.len() > spec::NAME_MAX
  }

  pub fn directory_entry(&self) -> DirectoryEntry {
    DirectoryEntry::new(self.name, self.offset, self.size)
  }
}

/// Ordered payload layout, ready to be written.
#[derive(Debug, Clone)]
pub struct Plan {
  descriptors: Vec<PayloadDescriptor>,
  image_size: u64,
}

impl Plan {
  pub fn descriptors(&self) -> &[PayloadDescriptor] {
    &self.descriptors
  }

  pub fn len(&self) -> usize {
    self.descriptors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.descriptors.is_empty()
  }

  /// Size of the finished image: the directory plus every padded payload.
  pub fn image_size(&self) -> u64 {
    self.image_size
  }

  pub fn directory(&self) -> Result<ImageDirectory> {
    ImageDirectory::from_entries(self.descriptors.iter().map(|d| d.directory_entry()))
  }

  /// Checks that `image` carries exactly this layout.
  pub fn verify(&self, image: &Image<'_>) -> Result<()> {
    let entries = image.directory().entries();

    if entries.len() != self.descriptors.len() {
      return Err(Error::VerifyMismatch {
        index: entries.len().min(self.descriptors.len()),
      });
    }

    for (index, (entry, descriptor)) in entries.iter().zip(&self.descriptors).enumerate() {
      if *entry != descriptor.directory_entry() {
        return Err(Error::VerifyMismatch { index });
      }
    }

    if image.len() as u64 != self.image_size {
      return Err(Error::VerifyMismatch {
        index: self.descriptors.len(),
      });
    }

    Ok(())
  }
}

pub struct Planner {
  classifier: NameClassifier,
}

impl Planner {
  pub fn new(options: PlannerOptions) -> Self {
    Self {
      classifier: NameClassifier::new(&options.preserved_extensions),
    }
  }

  /// Lays out `inputs` in order, reading only file metadata.
  pub fn plan<I, P>(&self, inputs: I) -> Result<Plan>
  where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
  {
    let inputs: Vec<PathBuf> = inputs
      .into_iter()
      .map(|p| p.as_ref().to_path_buf())
      .collect();

    if inputs.is_empty() {
      return Err(Error::NoInputs);
    }

    if inputs.len() > spec::MAX_ENTRIES {
      return Err(Error::InputCountExceeded {
        count: inputs.len(),
        max: spec::MAX_ENTRIES,
      });
    }

    let mut allocator = OffsetAllocator::new(spec::SECTOR_SIZE, spec::DIRECTORY_SIZE as u64);
    let mut seen: HashMap<EntryName, PathBuf> = HashMap::new();
    let mut descriptors = Vec::with_capacity(inputs.len());

    for source in inputs {
      let size = source_size(&source)?;

      let display_name = self
        .classifier
        .display_name(&source)
        .ok_or_else(|| Error::InvalidName(source.clone()))?
        .to_owned();
      let name = EntryName::from_str_truncated(&display_name);

      match seen.entry(name) {
        hash_map::Entry::Vacant(vacant) => {
          vacant.insert(source.clone());
        }
        hash_map::Entry::Occupied(occupied) => {
          return Err(Error::DuplicateName {
            name: name.to_string_lossy().into_owned(),
            first: occupied.get().clone(),
            second: source,
          });
        }
      }

      if size > u32::MAX as u64 {
        return Err(Error::ImageTooLarge {
          size: allocator.end().saturating_add(size),
        });
      }

      let offset = allocator
        .allocate(size)
        .ok_or(Error::ImageTooLarge { size: u64::MAX })?;
      if allocator.end() > u32::MAX as u64 {
        return Err(Error::ImageTooLarge {
          size: allocator.end(),
        });
      }

      let descriptor = PayloadDescriptor {
        display_name,
        name,
        size: size as u32,
        offset: offset as u32,
        source,
      };

      if descriptor.is_truncated() {
        log::warn!(
          "Entry name truncated to {:?}: {}",
          descriptor.name,
          descriptor.source.display()
        );
      }

      log::info!(
        "Planned {} ({} bytes) at offset {}",
        descriptor.display_name,
        descriptor.size,
        descriptor.offset
      );

      descriptors.push(descriptor);
    }

    Ok(Plan {
      descriptors,
      image_size: allocator.end(),
    })
  }
}

impl Default for Planner {
  fn default() -> Self {
    Self::new(PlannerOptions::default())
  }
}

/// Lays out `inputs` with the default naming rules.
pub fn plan<I, P>(inputs: I) -> Result<Plan>
where
  I: IntoIterator<Item = P>,
  P: AsRef<Path>,
{
  Planner::default().plan(inputs)
}

/// Size of a readable, non-empty regular file.
fn source_size(path: &Path) -> Result<u64> {
  let metadata = std::fs::File::open(path)
    .and_then(|file| file.metadata())
    .map_err(|_| Error::InputNotFound(path.to_path_buf()))?;

  if !metadata.is_file() {
    return Err(Error::InputNotFound(path.to_path_buf()));
  }

  // The loader refuses a table holding any zero-sized entry.
  if metadata.len() == 0 {
    return Err(Error::EmptyInput(path.to_path_buf()));
  }

  Ok(metadata.len())
}
