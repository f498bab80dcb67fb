use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::config::Backend;
use crate::types::BodyPart;

#[derive(Parser)]
#[command(name = "ironlog", version, about = "Personal workout tracker")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Emit machine-readable JSON instead of colorful text.
    #[arg(global = true, long)]
    pub json: bool,

    /// Increase log verbosity (-v, -vv). Defaults to INFO.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease log verbosity (-q, -qq).
    #[arg(short = 'q', long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Directory holding the collections (overrides `data_dir` from config)
    #[arg(global = true, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Storage backend (overrides `backend` from config)
    #[arg(global = true, long, value_enum)]
    pub backend: Option<Backend>,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Exercise catalog
    #[command(subcommand, visible_alias = "ex")]
    Exercise(ExerciseCmd),

    /// Workout plans
    #[command(subcommand, visible_alias = "w")]
    Workout(WorkoutCmd),

    /// Logged training sessions
    #[command(subcommand, visible_alias = "s")]
    Session(SessionCmd),

    /// Show today / this week / this month totals and the body-part split
    #[command(visible_alias = "st")]
    Stats {
        /// Attribute exercises to their catalog body part instead of one shared label
        #[arg(long)]
        resolve_body_parts: bool,
    },

    /// View or edit ironlog config
    #[command(subcommand)]
    Config(ConfigCmd),
}

//
// Commands
//

#[derive(Debug, Subcommand)]
pub enum ExerciseCmd {
    /// Add a new exercise
    #[command(visible_alias = "a")]
    Add {
        /// Exercise name
        name: String,

        /// Body part trained
        #[arg(short, long, value_enum)]
        body_part: BodyPart,

        /// Exercise description
        #[arg(short, long)]
        desc: Option<String>,

        /// Image URL (see `exercise image` to upload one)
        #[arg(long)]
        image: Option<String>,

        /// Calories burned per rep
        #[arg(long)]
        cal_per_rep: Option<f64>,

        /// Calories burned per minute
        #[arg(long)]
        cal_per_min: Option<f64>,
    },

    /// Import exercises from a TOML file
    #[command(visible_alias = "i")]
    Import {
        /// Path to TOML file
        file: PathBuf,
    },

    /// List all exercises
    #[command(visible_alias = "l")]
    List {
        /// Filter by body part
        #[arg(short, long, value_enum)]
        body_part: Option<BodyPart>,
    },

    /// Show one exercise
    #[command(visible_alias = "s")]
    Show {
        /// Exercise index, id or name
        exercise: String,
    },

    /// Replace fields of an exercise
    #[command(visible_alias = "e")]
    Edit {
        /// Exercise index, id or name
        exercise: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long)]
        desc: Option<String>,

        #[arg(short, long, value_enum)]
        body_part: Option<BodyPart>,

        #[arg(long)]
        cal_per_rep: Option<f64>,

        #[arg(long)]
        cal_per_min: Option<f64>,
    },

    /// Upload an image and attach it to an exercise
    Image {
        /// Exercise index, id or name
        exercise: String,

        /// Image file to upload
        file: PathBuf,
    },

    /// Delete an exercise
    #[command(visible_alias = "d")]
    Delete {
        /// Exercise index, id or name
        exercise: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum WorkoutCmd {
    /// Create an empty workout plan
    #[command(visible_alias = "a")]
    Add {
        name: String,

        #[arg(short, long)]
        desc: Option<String>,

        #[arg(short, long, value_enum)]
        body_part: Option<BodyPart>,
    },

    /// Append an exercise to a workout - Usage: workout add-ex WORKOUT EXERCISE --sets N --reps N
    #[command(visible_alias = "ae")]
    AddEx {
        /// Workout index, id or name
        workout: String,

        /// Exercise index, id or name
        exercise: String,

        #[arg(short, long, default_value = "3")]
        sets: u32,

        #[arg(short, long, default_value = "10")]
        reps: u32,

        /// Weight in kg
        #[arg(short, long, default_value = "0")]
        weight: u32,

        /// Rest between sets in seconds
        #[arg(long, default_value = "90")]
        rest: u32,
    },

    /// List workouts
    #[command(visible_alias = "l")]
    List,

    /// Show a workout in detail
    #[command(visible_alias = "s")]
    Show {
        /// Workout index, id or name
        workout: String,
    },

    /// Delete a workout
    #[command(visible_alias = "d")]
    Delete {
        /// Workout index, id or name
        workout: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum SessionCmd {
    /// Start a session of a workout
    Start {
        /// Workout index, id or name
        workout: String,
    },

    /// Log completed sets of an exercise - Usage: session log SESSION EXERCISE REPS...
    #[command(override_usage = "session log <SESSION> <EXERCISE> <REPS>...")]
    Log {
        /// Session index or id
        session: String,

        /// Exercise index, id or name
        exercise: String,

        /// Reps done in each set
        #[arg(required = true, num_args = 1..)]
        reps: Vec<u32>,

        /// Rest taken after each set, in seconds (comma separated)
        #[arg(long, value_delimiter = ',')]
        rest: Vec<u32>,

        /// Calories burned; estimated from the catalog when omitted
        #[arg(long)]
        calories: Option<f64>,
    },

    /// Attach a free-text note to a session
    #[command(visible_alias = "n")]
    Note {
        /// Session index or id
        session: String,

        note: String,
    },

    /// Mark a session completed
    #[command(visible_alias = "f")]
    Finish {
        /// Session index or id
        session: String,
    },

    /// Show a session in detail
    #[command(visible_alias = "i")]
    Show {
        /// Session index or id
        session: String,
    },

    /// List sessions, optionally between two days (both included)
    #[command(visible_alias = "l")]
    List {
        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: Option<String>,

        /// Last day, YYYY-MM-DD
        #[arg(long)]
        end: Option<String>,
    },

    /// Delete a session
    #[command(visible_alias = "d")]
    Delete {
        /// Session index or id
        session: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Show all config keys
    List,

    /// Get the value of a key
    Get { key: String },

    /// Set or override a key
    Set { key: String, val: String },

    /// Remove a key
    Unset { key: String },
}
