//! Save and restore the locally owned patches of a collection.
//!
//! Every rank writes and reads only its own piece: a JSON header describing
//! the layout and a bincode payload with the rank's patches. Readers check the
//! header against the collection they restore into, so a checkpoint can only be
//! loaded into the layout it was written from.

use crate::data::distribution::DistributionMap;
use crate::data::field_patch::FieldPatch;
use crate::data::patch_collection::PatchCollection;
use crate::geometry::box_array::BoxArray;
use crate::patch_error::PatchSieveError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const PATCH_STORE_VERSION: u32 = 1;

/// Named external store for collection pieces.
pub trait PatchStore {
    fn save<const D: usize>(&self, name: &str, pc: &PatchCollection<D>) -> Result<(), PatchSieveError>;
    /// Restore into an already defined collection with the same layout.
    fn load<const D: usize>(&self, name: &str, pc: &mut PatchCollection<D>) -> Result<(), PatchSieveError>;
}

/// Layout description written next to each rank's patches.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PieceHeader<const D: usize> {
    pub version: u32,
    pub rank: usize,
    pub ncomp: usize,
    pub ngrow: i64,
    pub geometry: BoxArray<D>,
    pub dmap: DistributionMap,
}

impl<const D: usize> PieceHeader<D> {
    fn describe(pc: &PatchCollection<D>) -> Result<Self, PatchSieveError> {
        Ok(Self {
            version: PATCH_STORE_VERSION,
            rank: pc.rank()?,
            ncomp: pc.ncomp(),
            ngrow: pc.ngrow(),
            geometry: pc.box_array()?.as_ref().clone(),
            dmap: pc.distribution_map()?.as_ref().clone(),
        })
    }

    fn matches(&self, other: &Self) -> bool {
        self.rank == other.rank
            && self.ncomp == other.ncomp
            && self.ngrow == other.ngrow
            && self.geometry == other.geometry
            && self.dmap == other.dmap
    }
}

/// One directory per name, two files per rank.
#[derive(Clone, Debug)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn header_path(&self, name: &str, rank: usize) -> PathBuf {
        self.root.join(name).join(format!("header_{rank:05}.json"))
    }

    fn patches_path(&self, name: &str, rank: usize) -> PathBuf {
        self.root.join(name).join(format!("patches_{rank:05}.bin"))
    }
}

impl PatchStore for DirStore {
    fn save<const D: usize>(&self, name: &str, pc: &PatchCollection<D>) -> Result<(), PatchSieveError> {
        let header = PieceHeader::describe(pc)?;
        fs::create_dir_all(self.root.join(name))?;
        let pieces: Vec<(usize, &FieldPatch<D>)> = pc.iter().collect();
        fs::write(self.patches_path(name, header.rank), bincode::serialize(&pieces)?)?;
        fs::write(
            self.header_path(name, header.rank),
            serde_json::to_vec_pretty(&header)?,
        )?;
        log::debug!(
            "saved {} patch(es) of rank {} to {}",
            pieces.len(),
            header.rank,
            self.root.join(name).display()
        );
        Ok(())
    }

    fn load<const D: usize>(&self, name: &str, pc: &mut PatchCollection<D>) -> Result<(), PatchSieveError> {
        let expect = PieceHeader::describe(pc)?;
        let found: PieceHeader<D> =
            serde_json::from_slice(&fs::read(self.header_path(name, expect.rank))?)?;
        if found.version != PATCH_STORE_VERSION {
            return Err(PatchSieveError::Io(format!(
                "unsupported store version {}",
                found.version
            )));
        }
        if !found.matches(&expect) {
            return Err(PatchSieveError::Configuration(format!(
                "stored piece '{name}' was written for a different layout"
            )));
        }
        let pieces: Vec<(usize, FieldPatch<D>)> =
            bincode::deserialize(&fs::read(self.patches_path(name, expect.rank))?)?;
        if !pieces.iter().map(|(k, _)| *k).eq(pc.owned_indices().iter().copied()) {
            return Err(PatchSieveError::Io(format!(
                "stored piece '{name}' does not hold the patches of rank {}",
                expect.rank
            )));
        }
        pc.replace_patches(pieces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{IndexBox, IntVect};

    fn scratch(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("patch-sieve-io-{tag}-{}", std::process::id()))
    }

    #[test]
    fn save_then_load_restores_values() {
        let ba: BoxArray<2> = vec![IndexBox::new([0, 0], [3, 3]), IndexBox::new([4, 0], [7, 3])].into();
        let dm = DistributionMap::new(vec![0, 0]);
        let mut pc = PatchCollection::new(ba.clone(), dm.clone(), 2, 1, 0).unwrap();
        pc.patch_mut(1).unwrap().set(&IntVect([5, 2]), 1, 42.0).unwrap();
        let store = DirStore::new(scratch("roundtrip"));
        store.save("chk", &pc).unwrap();

        let mut back = PatchCollection::new(ba, dm, 2, 1, 0).unwrap();
        store.load("chk", &mut back).unwrap();
        assert_eq!(back.patch(1).unwrap(), pc.patch(1).unwrap());
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn layout_mismatch_is_rejected() {
        let ba: BoxArray<1> = vec![IndexBox::new([0], [3])].into();
        let dm = DistributionMap::new(vec![0]);
        let pc = PatchCollection::new(ba.clone(), dm.clone(), 1, 0, 0).unwrap();
        let store = DirStore::new(scratch("mismatch"));
        store.save("chk", &pc).unwrap();
        let mut other = PatchCollection::new(ba, dm, 2, 0, 0).unwrap();
        assert!(matches!(
            store.load("chk", &mut other),
            Err(PatchSieveError::Configuration(_))
        ));
        let mut undefined = PatchCollection::<1>::default();
        assert!(matches!(
            store.load("chk", &mut undefined),
            Err(PatchSieveError::NotDefined)
        ));
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn damaged_piece_leaves_every_patch_untouched() {
        let ba: BoxArray<1> = vec![IndexBox::new([0], [3]), IndexBox::new([4], [7])].into();
        let dm = DistributionMap::new(vec![0, 0]);
        let mut pc = PatchCollection::new(ba.clone(), dm.clone(), 1, 0, 0).unwrap();
        pc.set_val(1.0).unwrap();
        let store = DirStore::new(scratch("damaged"));
        store.save("chk", &pc).unwrap();

        // second patch written with the wrong box
        let pieces = vec![
            (0usize, FieldPatch::from_data(IndexBox::new([0], [3]), 1, vec![9.0; 4]).unwrap()),
            (1usize, FieldPatch::from_data(IndexBox::new([4], [6]), 1, vec![9.0; 3]).unwrap()),
        ];
        fs::write(store.patches_path("chk", 0), bincode::serialize(&pieces).unwrap()).unwrap();

        let mut back = PatchCollection::new(ba, dm, 1, 0, 0).unwrap();
        back.set_val(2.0).unwrap();
        assert!(matches!(
            store.load("chk", &mut back),
            Err(PatchSieveError::Configuration(_))
        ));
        assert!(back.iter().all(|(_, p)| p.data().iter().all(|&v| v == 2.0)));
        let _ = fs::remove_dir_all(store.root());
    }
}
