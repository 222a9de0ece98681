//! The per-rank loading pipeline.
//!
//! Reader → mesh structure builder → schedule builder (solid, then fluid if
//! present) → diagnostics. Each rank runs the pipeline independently; the
//! only synchronization is barriers staggering file opens across I/O waves
//! and serializing the diagnostic summary. No data crosses rank boundaries
//! here — the pipeline *prepares* the exchange the solver performs later.
//!
//! On `Err`, other ranks may already be blocked in a barrier or reduction,
//! so the embedding solver must abort the whole communicator (MPI_Abort
//! semantics) with [`crate::error::AxipartError::exit_code`]; there is no
//! partial or degraded startup mode.

use crate::comm::Communicator;
use crate::comm::schedule::{Domain, ExchangeHandles, HaloExchange};
use crate::diagnostics::GlobalDiagnostics;
use crate::error::AxipartError;
use crate::io::MeshDatabase;
use crate::mesh::MeshPartition;
use crate::model::{EXTERNAL_MODEL_FILE, EXTERNAL_MODEL_NAME, ModelCatalog, ModelHandle};
use std::path::PathBuf;

/// Run configuration for the loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Directory holding the per-rank databases (and `external_model.bm`).
    pub data_dir: PathBuf,
    /// Whether the run requests anelastic attenuation.
    pub attenuation: bool,
    /// Ranks per file-open wave; barriers separate waves to avoid I/O storms
    /// on shared filesystems. Has no effect on correctness.
    pub io_stagger: usize,
}

impl LoaderConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            attenuation: false,
            io_stagger: 8,
        }
    }
}

/// Everything one rank needs from its partition, exclusively owned.
///
/// Handle slots are reserved here, one per peer per direction; the solver's
/// exchange step fills and drains them each time step.
pub struct PartitionContext<C: Communicator> {
    pub mesh: MeshPartition,
    /// Solid halo exchange; `None` when this rank has no solid neighbors.
    pub solid: Option<HaloExchange>,
    pub solid_handles: Option<ExchangeHandles<C>>,
    /// Fluid halo exchange; `None` when the mesh has no fluid region or this
    /// rank has no fluid neighbors.
    pub fluid: Option<HaloExchange>,
    pub fluid_handles: Option<ExchangeHandles<C>>,
    pub diagnostics: GlobalDiagnostics,
}

impl<C: Communicator> std::fmt::Debug for PartitionContext<C>
where
    C::SendHandle: std::fmt::Debug,
    C::RecvHandle: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionContext")
            .field("mesh", &self.mesh)
            .field("solid", &self.solid)
            .field("solid_handles", &self.solid_handles)
            .field("fluid", &self.fluid)
            .field("fluid_handles", &self.fluid_handles)
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

fn log_fail<T>(
    rank: usize,
    stage: &str,
    result: Result<T, AxipartError>,
) -> Result<T, AxipartError> {
    result.inspect_err(|e| log::error!("rank {rank}: {stage}: {e}"))
}

/// Load this rank's partition and build its communication schedules.
pub fn load_partition<C: Communicator>(
    cfg: &LoaderConfig,
    catalog: &impl ModelCatalog,
    comm: &C,
) -> Result<PartitionContext<C>, AxipartError> {
    let rank = comm.rank();
    let size = comm.size();
    let stride = cfg.io_stagger.max(1);
    let waves = size.div_ceil(stride);
    let my_wave = rank / stride;

    // Stagger opens: wave w opens between barriers w and w+1. Every rank
    // passes the same number of barriers, so an open failure still reaches
    // the synchronization point before propagating.
    for _ in 0..my_wave {
        comm.barrier();
    }
    let opened = MeshDatabase::open(&cfg.data_dir, rank);
    for _ in my_wave..waves {
        comm.barrier();
    }
    let mut db = log_fail(rank, "open", opened)?;

    let raw = log_fail(rank, "mesh records", db.read_raw())?;

    // Background-model resolution; an external model pulls in its table now.
    let flags = log_fail(rank, "model lookup", catalog.lookup(&raw.model_name))?;
    let external = if raw.model_name == EXTERNAL_MODEL_NAME {
        let path = cfg.data_dir.join(EXTERNAL_MODEL_FILE);
        Some(log_fail(rank, "external model", catalog.load_external(&path))?)
    } else {
        None
    };
    let model = ModelHandle {
        name: raw.model_name.clone(),
        flags,
        external,
    };

    let npoin = raw.npoin();
    let has_fluid = raw.has_fluid;

    // Configuration validation happens inside build, before any schedule is
    // read, so a bad run setup never leaves partial structures behind.
    let mesh = log_fail(
        rank,
        "mesh build",
        MeshPartition::build(raw, model, cfg.attenuation),
    )?;

    let solid = log_fail(rank, "solid schedule", db.read_halo(Domain::Solid, npoin))?;
    let fluid = if has_fluid {
        log_fail(rank, "fluid schedule", db.read_halo(Domain::Fluid, npoin))?
    } else {
        None
    };

    let solid_handles = solid.as_ref().map(ExchangeHandles::<C>::reserve);
    let fluid_handles = fluid.as_ref().map(ExchangeHandles::<C>::reserve);

    log_fail(rank, "close", db.finish())?;

    // Serialize the diagnostic summary behind a barrier so the reductions
    // below see every rank past its file I/O.
    comm.barrier();
    let diagnostics = GlobalDiagnostics::gather(comm, &mesh, solid.as_ref(), fluid.as_ref());

    log::info!(
        "rank {rank}: partition ready ({} nodes, {} elements, solid peers {}, fluid peers {})",
        mesh.coords.len(),
        mesh.connectivity.len(),
        solid.as_ref().map_or(0, HaloExchange::peer_count),
        fluid.as_ref().map_or(0, HaloExchange::peer_count),
    );

    Ok(PartitionContext {
        mesh,
        solid,
        solid_handles,
        fluid,
        fluid_handles,
        diagnostics,
    })
}
