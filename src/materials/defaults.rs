//! Literature defaults: ⟨100⟩ Si substrate with a GaAs/AlGaAs crystalline coating.
//!
//! The stack is 11 AlGaAs layers and 12 GaAs layers of 266 nm (the outer GaAs
//! layer is double thickness). AlGaAs is the layer bonded to the substrate.
//!
//! Units in the source tables differ and are converted here:
//! - Si specific heat is tabulated per mole; divided by the molar mass (0.028 kg/mol).
//! - Coating specific heat is tabulated in J/(g·K); multiplied by 1000.

use super::{CoatingStack, Material, MaterialConstants, MaterialPropertyTable, MaterialSet};

const T_EXPANSION: [f64; 7] = [12.0, 20.0, 50.0, 100.0, 122.0, 200.0, 300.0];
const T_CONDUCTIVITY: [f64; 10] = [12.0, 20.0, 50.0, 100.0, 122.0, 150.0, 175.0, 200.0, 250.0, 300.0];

const SI_MOLAR_MASS: f64 = 0.028;
const GRAMS_PER_KG: f64 = 1000.0;

pub const LAYER_THICKNESS: f64 = 266e-9;
pub const ALGAAS_LAYERS: u32 = 11;
pub const GAAS_LAYERS: u32 = 12;

fn table(name: &str, temperatures: &[f64], values: &[f64]) -> MaterialPropertyTable {
    // Built directly: the literals below are known to satisfy the table invariants
    // (checked by `literature_tables_are_valid`).
    MaterialPropertyTable {
        name: name.to_string(),
        temperatures: temperatures.to_vec(),
        values: values.to_vec(),
    }
}

pub fn silicon() -> Material {
    Material {
        name: "Si".to_string(),
        constants: MaterialConstants {
            youngs_modulus: 169e9,
            poisson_ratio: 0.28,
            bulk_modulus: 95e9,
            density: 2330.0,
            thickness: 0.0005,
        },
        expansion: table(
            "Si.expansion",
            &T_EXPANSION,
            &[0.13e-8, -0.27e-8, -45e-8, -33e-8, -5e-8, 1.4e-6, 2.6e-6],
        ),
        specific_heat: table(
            "Si.specific_heat",
            &[12.0, 20.0, 50.0, 100.0, 122.0, 200.0, 250.0, 300.0],
            &[1.45, 1.6, 2.5, 7.5, 10.0, 17.0, 19.0, 20.24],
        )
        .scaled(1.0 / SI_MOLAR_MASS),
        conductivity: table(
            "Si.conductivity",
            &T_CONDUCTIVITY,
            &[1800.0, 3000.0, 2600.0, 950.0, 620.0, 420.0, 325.0, 266.0, 195.0, 156.0],
        ),
    }
}

fn stack_specific_heat(name: &str) -> MaterialPropertyTable {
    table(
        name,
        &[12.0, 20.0, 30.0, 40.0, 50.0, 100.0, 122.0, 200.0, 300.0],
        &[0.027, 0.051, 0.074, 0.097, 0.12, 0.21, 0.25, 0.39, 0.57],
    )
    .scaled(GRAMS_PER_KG)
}

fn stack_conductivity(name: &str) -> MaterialPropertyTable {
    table(
        name,
        &T_CONDUCTIVITY,
        &[350.0, 250.0, 75.0, 25.0, 20.0, 18.1, 16.4, 15.0, 12.5, 10.0],
    )
}

/// AlGaAs; thickness is the total coating thickness seen by the interface model.
pub fn algaas() -> Material {
    Material {
        name: "AlGaAs".to_string(),
        constants: MaterialConstants {
            youngs_modulus: 8.36e10,
            poisson_ratio: 0.40,
            bulk_modulus: 7.79e10,
            density: 2330.0,
            thickness: 6.28e-6,
        },
        expansion: table(
            "AlGaAs.expansion",
            &T_EXPANSION,
            &[-1e-9, -1e-8, -0.13e-6, 0.8e-6, 1.4e-6, 3.65e-6, 5.0e-6],
        ),
        specific_heat: stack_specific_heat("AlGaAs.specific_heat"),
        conductivity: stack_conductivity("AlGaAs.conductivity"),
    }
}

/// GaAs shares the stack's thermal tables but has its own expansion curve.
pub fn gaas() -> Material {
    Material {
        name: "GaAs".to_string(),
        constants: MaterialConstants {
            youngs_modulus: 8.53e10,
            poisson_ratio: 0.31,
            bulk_modulus: 7.55e10,
            density: 5320.0,
            thickness: LAYER_THICKNESS * GAAS_LAYERS as f64,
        },
        expansion: table(
            "GaAs.expansion",
            &T_EXPANSION,
            &[-1e-8, -1e-7, -0.5e-6, 1.9e-6, 2.3e-6, 4.5e-6, 5.8e-6],
        ),
        specific_heat: stack_specific_heat("GaAs.specific_heat"),
        conductivity: stack_conductivity("GaAs.conductivity"),
    }
}

pub fn literature_set() -> MaterialSet {
    MaterialSet {
        substrate: silicon(),
        coating: algaas(),
        coating2: Some(gaas()),
        stack: CoatingStack::layered(LAYER_THICKNESS, ALGAAS_LAYERS, GAAS_LAYERS),
    }
}
