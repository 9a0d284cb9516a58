//! Deterministic hardware dataset used when no CSV source is given

use shardbench_core::Record;

const CPUS: [&str; 7] = [
    "AMD Ryzen 5 5600X",
    "AMD Ryzen 7 7800X3D",
    "AMD Ryzen 9 7950X",
    "Intel Core i5-12400F",
    "Intel Core i7-13700K",
    "Intel Core i9-14900K",
    "Intel Core Ultra 7 265K",
];

const GPUS: [&str; 6] = [
    "NVIDIA GeForce RTX 3060",
    "NVIDIA GeForce RTX 4070 Super",
    "NVIDIA GeForce RTX 4090",
    "AMD Radeon RX 6700 XT",
    "AMD Radeon RX 7900 XTX",
    "Intel Arc A770",
];

const RAMS: [&str; 5] = [
    "Corsair Vengeance 16GB DDR4-3200",
    "G.Skill Trident Z5 32GB DDR5-6000",
    "Kingston Fury Beast 32GB DDR4-3600",
    "Crucial Pro 64GB DDR5-5600",
    "TeamGroup T-Force Delta 16GB DDR5-6400",
];

const MOTHERBOARDS: [&str; 8] = [
    "ASUS ROG Strix B550-F",
    "MSI MAG B650 Tomahawk",
    "Gigabyte X670E Aorus Master",
    "ASRock B760M Pro RS",
    "ASUS TUF Gaming Z790-Plus",
    "MSI PRO Z690-A",
    "Gigabyte B650 Gaming X AX",
    "ASRock X570 Taichi",
];

const PSUS: [&str; 9] = [
    "Corsair RM750x",
    "Seasonic Focus GX-650",
    "EVGA SuperNOVA 850 G6",
    "be quiet! Straight Power 12 1000W",
    "Cooler Master MWE Gold 750",
    "Thermaltake Toughpower GF3 1200W",
    "Fractal Ion+ 2 860W",
    "NZXT C850",
    "Lian Li SP850",
];

/// Generate `rows` records with ids `1..=rows`
///
/// Part names are picked by id from fixed lists, each with its own stride,
/// so the same row count always yields the same table.
pub fn generate_hardware(rows: usize) -> Vec<Record> {
    (1..=rows as i64).map(hardware_record).collect()
}

fn hardware_record(id: i64) -> Record {
    let pick = |names: &[&str], stride: i64| -> String {
        let idx = (id * stride).rem_euclid(names.len() as i64) as usize;
        names[idx].to_string()
    };

    Record {
        id,
        cpu_name: pick(&CPUS[..], 1),
        gpu_name: pick(&GPUS[..], 5),
        ram_name: pick(&RAMS[..], 3),
        motherboard_name: pick(&MOTHERBOARDS[..], 7),
        psu_name: pick(&PSUS[..], 2),
    }
}
