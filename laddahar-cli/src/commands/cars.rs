use clap::Args;

use laddahar_core::CAR_PRESETS;

/// List the car presets offered by `user add --car`
#[derive(Args)]
pub struct CarsCommand {}

impl CarsCommand {
    pub fn run(&self) {
        println!("Car presets");
        println!("===========");
        println!();
        for preset in CAR_PRESETS {
            println!("  {:<22} {:>5.1} kWh", preset.name, preset.capacity);
        }
        println!();
        println!("Use 'Other' with --model and --capacity for anything else.");
    }
}
