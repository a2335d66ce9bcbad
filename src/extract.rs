//! Extraction of a [`Results`] record from a solved model.
use crate::id::TechID;
use crate::model::{DecisionVariable, SolvedModel, VariableKey, VariableName};
use crate::results::{
    ClassMatrices, ClassVectors, HourInfo, ModelStatus, RESULT_PARAMETERS, Results,
};
use crate::sets::ModelSets;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::debug;
use ndarray::{Array1, Array2, Array3};

/// Read every solved value of interest out of a model.
///
/// Electricity and storage level are read into one (hour × region) matrix per
/// (technology, class) combination. A value missing from the model is an error.
///
/// # Arguments
///
/// * `model` - The solved model
/// * `status` - The termination status reported by the solver
pub fn extract_results<M: SolvedModel + ?Sized>(
    model: &M,
    status: ModelStatus,
) -> Result<Results> {
    let sets = model.sets().clone();
    let variable = |name| {
        model
            .variable(name)
            .with_context(|| format!("Could not read variable {name}"))
    };

    let params = RESULT_PARAMETERS
        .iter()
        .map(|&name| Ok((name.to_string(), model.parameter(name)?.clone())))
        .collect::<Result<IndexMap<_, _>>>()?;

    let results = Results {
        status,
        options: model.options().clone(),
        hour_info: HourInfo {
            hours_per_period: model.hours_per_period(),
        },
        params,
        system_cost: per_region(
            &sets,
            variable(VariableName::SystemCost)?,
            &VariableKey::new(),
        )
        .context("Failed to extract system cost")?,
        co2_emissions: per_region(
            &sets,
            variable(VariableName::CO2Emissions)?,
            &VariableKey::new(),
        )
        .context("Failed to extract CO2 emissions")?,
        fuel_use: fuel_use(&sets, variable(VariableName::FuelUse)?)
            .context("Failed to extract fuel use")?,
        electricity: electricity(&sets, variable(VariableName::Electricity)?)
            .context("Failed to extract electricity")?,
        charging: charging(&sets, variable(VariableName::Charging)?)
            .context("Failed to extract charging")?,
        storage_level: storage_level(&sets, variable(VariableName::StorageLevel)?)
            .context("Failed to extract storage level")?,
        transmission: transmission(&sets, variable(VariableName::Transmission)?)
            .context("Failed to extract transmission")?,
        transmission_capacity: transmission_capacity(
            &sets,
            variable(VariableName::TransmissionCapacity)?,
        )
        .context("Failed to extract transmission capacity")?,
        capacity: capacity(&sets, variable(VariableName::Capacity)?)
            .context("Failed to extract capacity")?,
        sets,
    };
    debug!(
        "Extracted results for {} technology/class combinations",
        results.electricity.len()
    );

    Ok(results)
}

/// Fill a vector over regions from keys which differ only in region
fn per_region(
    sets: &ModelSets,
    variable: &dyn DecisionVariable,
    key: &VariableKey,
) -> Result<Array1<f64>> {
    sets.regions
        .iter()
        .map(|region| variable.value(&key.clone().region(region)))
        .collect::<Result<Vec<_>>>()
        .map(Array1::from)
}

fn fuel_use(sets: &ModelSets, variable: &dyn DecisionVariable) -> Result<Array2<f64>> {
    let mut values = Array2::zeros((sets.num_regions(), sets.techs.len()));
    for (r, region) in sets.regions.iter().enumerate() {
        for (k, tech) in sets.techs.iter().enumerate() {
            values[[r, k]] = variable.value(&VariableKey::new().region(region).tech(tech))?;
        }
    }

    Ok(values)
}

/// Fill an (hour × region) matrix from keys which differ only in region and hour
fn hourly_matrix(
    sets: &ModelSets,
    variable: &dyn DecisionVariable,
    key: &VariableKey,
) -> Result<Array2<f64>> {
    let mut matrix = Array2::zeros((sets.hours, sets.num_regions()));
    for (r, region) in sets.regions.iter().enumerate() {
        let key = key.clone().region(region);
        for hour in 0..sets.hours {
            matrix[[hour, r]] = variable.value(&key.clone().hour(hour))?;
        }
    }

    Ok(matrix)
}

fn electricity(sets: &ModelSets, variable: &dyn DecisionVariable) -> Result<ClassMatrices> {
    let mut matrices = ClassMatrices::new();
    for tech in &sets.techs {
        for class in sets.classes_of(tech)? {
            let key = VariableKey::new().tech(tech).class(class);
            matrices.insert(tech, class, hourly_matrix(sets, variable, &key)?)?;
        }
    }

    Ok(matrices)
}

fn storage_level(sets: &ModelSets, variable: &dyn DecisionVariable) -> Result<ClassMatrices> {
    let mut matrices = ClassMatrices::new();
    for tech in sets.storage_techs() {
        for class in sets.storage_classes_of(tech)? {
            let key = VariableKey::new().tech(tech).class(class);
            matrices.insert(tech, class, hourly_matrix(sets, variable, &key)?)?;
        }
    }

    Ok(matrices)
}

fn charging(
    sets: &ModelSets,
    variable: &dyn DecisionVariable,
) -> Result<IndexMap<TechID, Array2<f64>>> {
    sets.storage_techs()
        .map(|tech| {
            let key = VariableKey::new().tech(tech);
            Ok((tech.clone(), hourly_matrix(sets, variable, &key)?))
        })
        .collect()
}

fn capacity(sets: &ModelSets, variable: &dyn DecisionVariable) -> Result<ClassVectors> {
    let mut vectors = ClassVectors::new();
    for tech in &sets.techs {
        for class in sets.classes_of(tech)? {
            let key = VariableKey::new().tech(tech).class(class);
            vectors.insert(tech, class, per_region(sets, variable, &key)?)?;
        }
    }

    Ok(vectors)
}

/// Transmission between a region and itself is not modelled and is always zero
fn transmission(sets: &ModelSets, variable: &dyn DecisionVariable) -> Result<Array3<f64>> {
    let n = sets.num_regions();
    let mut values = Array3::zeros((sets.hours, n, n));
    for (r1, from) in sets.regions.iter().enumerate() {
        for (r2, to) in sets.regions.iter().enumerate() {
            if r1 == r2 {
                continue;
            }
            let key = VariableKey::new().region(from).to_region(to);
            for hour in 0..sets.hours {
                values[[hour, r1, r2]] = variable.value(&key.clone().hour(hour))?;
            }
        }
    }

    Ok(values)
}

fn transmission_capacity(
    sets: &ModelSets,
    variable: &dyn DecisionVariable,
) -> Result<Array2<f64>> {
    let n = sets.num_regions();
    let mut values = Array2::zeros((n, n));
    for (r1, from) in sets.regions.iter().enumerate() {
        for (r2, to) in sets.regions.iter().enumerate() {
            if r1 != r2 {
                let key = VariableKey::new().region(from).to_region(to);
                values[[r1, r2]] = variable.value(&key)?;
            }
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{
        CAPACITY, ELECTRICITY, HOURS_PER_PERIOD, SYSTEM_COST, assert_error, model_data,
    };
    use crate::model::{ModelData, VariableData};
    use crate::results::DEMAND;
    use ndarray::array;
    use rstest::rstest;

    #[rstest]
    fn test_extract_results(model_data: ModelData) {
        let results = extract_results(&model_data, ModelStatus::Optimal).unwrap();
        assert_eq!(results.status, ModelStatus::Optimal);
        assert_eq!(results.hour_info.hours_per_period, HOURS_PER_PERIOD);
        assert_eq!(results.options, model_data.options);
        assert_eq!(results.sets, model_data.sets);
        assert_eq!(results.params[DEMAND], model_data.parameters[DEMAND]);
        assert_eq!(results.system_cost, Array1::from(SYSTEM_COST.to_vec()));
        results.check_shapes().unwrap();

        for (tech, class, values) in ELECTRICITY {
            let matrix = results.electricity.get(&tech.into(), &class.into()).unwrap();
            for (r, hourly) in values.iter().enumerate() {
                for (h, value) in hourly.iter().enumerate() {
                    assert_eq!(matrix[[h, r]], *value);
                }
            }
        }

        for (tech, class, values) in CAPACITY {
            let vector = results.capacity.get(&tech.into(), &class.into()).unwrap();
            assert_eq!(vector.to_vec(), values.to_vec());
        }
    }

    #[rstest]
    fn test_extract_storage(model_data: ModelData) {
        let results = extract_results(&model_data, ModelStatus::Optimal).unwrap();
        assert_eq!(results.charging.len(), 1);
        assert_eq!(
            results.charging[&TechID::new("battery")],
            array![[1.0, 1.0], [0.0, 0.0], [0.0, 0.0]]
        );
        assert_eq!(
            *results
                .storage_level
                .get(&"battery".into(), &"_".into())
                .unwrap(),
            array![[1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]
        );
    }

    #[rstest]
    fn test_extract_transmission(model_data: ModelData) {
        let results = extract_results(&model_data, ModelStatus::Optimal).unwrap();
        assert_eq!(
            results.transmission_capacity,
            array![[0.0, 1.0], [0.5, 0.0]]
        );
        assert_eq!(results.transmission[[1, 0, 1]], 1.0);
        assert_eq!(results.transmission[[1, 1, 0]], 0.0);
        assert_eq!(results.transmission[[0, 0, 0]], 0.0);
    }

    #[rstest]
    fn test_extract_with_status(model_data: ModelData) {
        let results = extract_results(&model_data, ModelStatus::Limit).unwrap();
        assert_eq!(results.status, ModelStatus::Limit);
    }

    #[rstest]
    fn test_extract_missing_class(mut model_data: ModelData) {
        // Declare a class for which the model has no values
        model_data
            .sets
            .classes
            .get_mut(&TechID::new("wind"))
            .unwrap()
            .insert("a2".into());
        assert_error!(
            extract_results(&model_data, ModelStatus::Optimal),
            "Failed to extract electricity"
        );
    }

    #[rstest]
    fn test_extract_missing_variable(mut model_data: ModelData) {
        model_data.variables.remove(&VariableName::Charging);
        assert_error!(
            extract_results(&model_data, ModelStatus::Optimal),
            "Could not read variable Charging"
        );
    }

    #[rstest]
    fn test_extract_missing_parameter(mut model_data: ModelData) {
        model_data.parameters.shift_remove(DEMAND);
        assert_error!(
            extract_results(&model_data, ModelStatus::Optimal),
            "Model has no parameter named demand"
        );
    }

    #[rstest]
    fn test_extract_scalar_variable(mut model_data: ModelData) {
        // A scalar variable has the same value for every region
        model_data
            .variables
            .insert(VariableName::CO2Emissions, VariableData::Scalar(7.0));
        let results = extract_results(&model_data, ModelStatus::Optimal).unwrap();
        assert_eq!(results.co2_emissions, array![7.0, 7.0]);
    }
}
