mod common;
mod hot_reload;
mod interaction;
mod replan;
mod scheduling;
mod startup;
mod tracking;
