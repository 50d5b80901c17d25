//! # Registrar CLI Module
//!
//! This module implements the CLI interface for Registrar.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show store status
//! - `bootstrap` - Load the demonstration dataset
//! - `exists` - Check an (institution, student, digest) triple
//! - `insert-profile` / `insert-taken` / `insert-catalog` - Insert a record
//! - `profile` / `catalog` / `taken` - Per-student lookups
//! - `institution` - Institution-wide listing of one relation
//! - `transcript` - Assemble a student's transcript
//! - `digest` - Compute a record's digest without storing it
//! - `digests` / `record` / `meta` - Digest listings and lookups
//! - `compact` - Compact the redb database file

mod commands;

use crate::config::{AppConfig, BackendKind};
use clap::{Args, Parser, Subcommand};
use registrar_core::{
    NewCatalogEntry, NewStudentProfile, NewTakenCourse, RegistrarError, Relation,
};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Registrar - content-addressed academic records
///
/// Stores student profiles, course results and catalog entries under the
/// digest of their content, and assembles transcripts from them.
#[derive(Parser, Debug)]
#[command(name = "registrar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the redb database (overrides config)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides config)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<BackendKind>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Identifies one student at one institution.
#[derive(Args, Debug, Clone)]
pub struct StudentArgs {
    /// Institution name
    #[arg(short, long)]
    pub institution: String,

    /// Student identifier
    #[arg(short, long)]
    pub student_id: String,
}

/// Fields of a new student profile.
#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    #[arg(short, long)]
    pub institution: String,
    #[arg(long)]
    pub faculty: String,
    #[arg(long)]
    pub department: String,
    #[arg(short, long)]
    pub student_id: u64,
    #[arg(long)]
    pub surname: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub national_id: String,
    /// Registration date, e.g. 02.09.2022
    #[arg(long)]
    pub registration_date: String,
    #[arg(long)]
    pub registration_type: String,
    #[arg(long)]
    pub program_type: String,
    #[arg(long, default_value = "1")]
    pub class: u32,
    #[arg(long, default_value = "1")]
    pub semester: u32,
}

impl From<ProfileArgs> for NewStudentProfile {
    fn from(args: ProfileArgs) -> Self {
        Self {
            institution: args.institution,
            faculty: args.faculty,
            department: args.department,
            student_id: args.student_id,
            student_surname: args.surname,
            student_name: args.name,
            national_id: args.national_id,
            registration_date: args.registration_date,
            registration_type: args.registration_type,
            program_type: args.program_type,
            class: args.class,
            student_semester: args.semester,
        }
    }
}

/// Fields of a new taken-course result.
#[derive(Args, Debug, Clone)]
pub struct TakenArgs {
    #[arg(short, long)]
    pub institution: String,
    #[arg(short, long)]
    pub student_id: u64,
    #[arg(long)]
    pub course_code: String,
    #[arg(long)]
    pub grade: String,
    #[arg(long)]
    pub point: f32,
    #[arg(long, default_value = "1")]
    pub semester: u32,
}

impl From<TakenArgs> for NewTakenCourse {
    fn from(args: TakenArgs) -> Self {
        Self {
            institution: args.institution,
            student_id: args.student_id,
            course_code: args.course_code,
            grade: args.grade,
            point: args.point,
            taken_semester: args.semester,
        }
    }
}

/// Fields of a new catalog entry.
#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    #[arg(short, long)]
    pub institution: String,
    #[arg(short, long)]
    pub student_id: u64,
    #[arg(long)]
    pub course_code: String,
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "C")]
    pub course_type: String,
    #[arg(long)]
    pub ects: u32,
    #[arg(long)]
    pub credit: u32,
}

impl From<CatalogArgs> for NewCatalogEntry {
    fn from(args: CatalogArgs) -> Self {
        Self {
            institution: args.institution,
            student_id: args.student_id,
            course_code: args.course_code,
            course_name: args.name,
            course_type: args.course_type,
            ects: args.ects,
            credit: args.credit,
        }
    }
}

/// Record kinds accepted by `digest`.
#[derive(Subcommand, Debug)]
pub enum DigestTarget {
    /// Digest a student profile
    Profile(ProfileArgs),
    /// Digest a taken-course result
    Taken(TakenArgs),
    /// Digest a catalog entry
    Catalog(CatalogArgs),
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show store status
    Status,

    /// Load the demonstration dataset
    Bootstrap,

    /// Check whether an (institution, student, digest) triple is indexed
    Exists {
        #[command(flatten)]
        student: StudentArgs,

        /// Record digest (hex)
        #[arg(short, long)]
        digest: String,
    },

    /// Insert a student profile
    InsertProfile(ProfileArgs),

    /// Insert a taken-course result
    InsertTaken(TakenArgs),

    /// Insert a course catalog entry
    InsertCatalog(CatalogArgs),

    /// Show a student's profile
    Profile(StudentArgs),

    /// List a student's catalog entries
    Catalog(StudentArgs),

    /// List a student's taken courses
    Taken(StudentArgs),

    /// List every record of one relation at an institution
    Institution {
        /// Institution name
        #[arg(short, long)]
        institution: String,

        /// Relation: profile, taken or catalog
        #[arg(short, long, value_parser = parse_relation)]
        relation: Relation,
    },

    /// Assemble a student's transcript
    Transcript(StudentArgs),

    /// Compute a record's digest without storing it
    Digest {
        #[command(subcommand)]
        target: DigestTarget,
    },

    /// List the digests of one relation indexed for a student
    Digests {
        #[command(flatten)]
        student: StudentArgs,

        /// Relation: profile, taken or catalog
        #[arg(short, long, value_parser = parse_relation)]
        relation: Relation,
    },

    /// Fetch one record by its digest
    Record {
        /// Relation: profile, taken or catalog
        #[arg(short, long, value_parser = parse_relation)]
        relation: Relation,

        /// Record digest (hex)
        #[arg(short, long)]
        digest: String,
    },

    /// List an institution's meta entries of one relation
    Meta {
        /// Institution name
        #[arg(short, long)]
        institution: String,

        /// Relation: profile, taken or catalog
        #[arg(short, long, value_parser = parse_relation)]
        relation: Relation,
    },

    /// Compact the redb database file
    Compact,
}

fn parse_relation(raw: &str) -> Result<Relation, String> {
    Relation::parse(raw).map_err(|e| e.to_string())
}

impl Cli {
    /// Configuration file and environment, then this invocation's flags.
    pub fn resolve_config(&self) -> Result<AppConfig, RegistrarError> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if let Some(path) = &self.database {
            config.storage.path = path.clone();
        }
        if let Some(backend) = self.backend {
            config.storage.backend = backend;
        }
        if let Some(Commands::Server { host, port }) = &self.command {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }
        Ok(config)
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), RegistrarError> {
    let config = cli.resolve_config()?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { .. }) => cmd_server(&config).await,
        Some(Commands::Status) | None => cmd_status(&config, json_mode),
        Some(Commands::Bootstrap) => cmd_bootstrap(&config, json_mode),
        Some(Commands::Exists { student, digest }) => {
            cmd_exists(&config, json_mode, &student, &digest)
        }
        Some(Commands::InsertProfile(args)) => {
            cmd_insert(&config, json_mode, &NewStudentProfile::from(args))
        }
        Some(Commands::InsertTaken(args)) => {
            cmd_insert(&config, json_mode, &NewTakenCourse::from(args))
        }
        Some(Commands::InsertCatalog(args)) => {
            cmd_insert(&config, json_mode, &NewCatalogEntry::from(args))
        }
        Some(Commands::Profile(student)) => {
            cmd_student_relation(&config, json_mode, &student, Relation::StudentProfile)
        }
        Some(Commands::Catalog(student)) => {
            cmd_student_relation(&config, json_mode, &student, Relation::CourseCatalogEntry)
        }
        Some(Commands::Taken(student)) => {
            cmd_student_relation(&config, json_mode, &student, Relation::TakenCourseResult)
        }
        Some(Commands::Institution {
            institution,
            relation,
        }) => cmd_institution(&config, json_mode, &institution, relation),
        Some(Commands::Transcript(student)) => cmd_transcript(&config, json_mode, &student),
        Some(Commands::Digest { target }) => match target {
            DigestTarget::Profile(args) => {
                cmd_digest(&config, json_mode, &NewStudentProfile::from(args))
            }
            DigestTarget::Taken(args) => cmd_digest(&config, json_mode, &NewTakenCourse::from(args)),
            DigestTarget::Catalog(args) => {
                cmd_digest(&config, json_mode, &NewCatalogEntry::from(args))
            }
        },
        Some(Commands::Digests { student, relation }) => {
            cmd_digests(&config, json_mode, &student, relation)
        }
        Some(Commands::Record { relation, digest }) => {
            cmd_record(&config, json_mode, relation, &digest)
        }
        Some(Commands::Meta {
            institution,
            relation,
        }) => cmd_meta(&config, json_mode, &institution, relation),
        Some(Commands::Compact) => cmd_compact(&config, json_mode),
    }
}

// =============================================================================
// TESTS
// =============================================================================
