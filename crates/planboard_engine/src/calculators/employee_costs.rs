//! Employee costs: headcount x salary x (1 + benefits%) per role and period.

use crate::error::ProviderError;
use crate::horizon::Horizon;
use crate::module::{ModuleResult, ResultProvider};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::RwLock;

pub const EMPLOYEE_COSTS_ID: &str = "employee-costs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffRole {
    pub name: String,
    pub count: BTreeMap<String, f64>,
    pub salary: BTreeMap<String, f64>,
}

impl StaffRole {
    fn new(name: &str, count: [f64; 4], salary: [f64; 4]) -> Self {
        Self {
            name: name.to_string(),
            count: per_default_period(count),
            salary: per_default_period(salary),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeCostParams {
    pub roles: Vec<StaffRole>,
    pub benefits_percentage: BTreeMap<String, f64>,
}

impl Default for EmployeeCostParams {
    fn default() -> Self {
        Self {
            roles: vec![
                StaffRole::new(
                    "executives",
                    [3.0, 4.0, 5.0, 5.0],
                    [200_000.0, 210_000.0, 220_500.0, 231_525.0],
                ),
                StaffRole::new(
                    "managers",
                    [5.0, 8.0, 12.0, 15.0],
                    [120_000.0, 126_000.0, 132_300.0, 138_915.0],
                ),
                StaffRole::new(
                    "developers",
                    [15.0, 25.0, 35.0, 45.0],
                    [100_000.0, 105_000.0, 110_250.0, 115_763.0],
                ),
                StaffRole::new(
                    "supportStaff",
                    [7.0, 12.0, 18.0, 25.0],
                    [60_000.0, 63_000.0, 66_150.0, 69_458.0],
                ),
            ],
            benefits_percentage: per_default_period([30.0; 4]),
        }
    }
}

fn per_default_period(values: [f64; 4]) -> BTreeMap<String, f64> {
    crate::horizon::DEFAULT_PERIODS
        .iter()
        .zip(values)
        .map(|(p, v)| (p.to_string(), v))
        .collect()
}

fn at(series: &BTreeMap<String, f64>, period: &str) -> f64 {
    series.get(period).copied().unwrap_or(0.0)
}

/// Cost module with adjustable parameters.
pub struct EmployeeCostsModule {
    id: String,
    horizon: Horizon,
    params: RwLock<EmployeeCostParams>,
}

impl EmployeeCostsModule {
    pub fn new(horizon: Horizon) -> Self {
        Self::with_params(horizon, EmployeeCostParams::default())
    }

    pub fn with_params(horizon: Horizon, params: EmployeeCostParams) -> Self {
        Self {
            id: EMPLOYEE_COSTS_ID.to_string(),
            horizon,
            params: RwLock::new(params),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn params(&self) -> Result<EmployeeCostParams, ProviderError> {
        self.params
            .read()
            .map(|p| p.clone())
            .map_err(|_| ProviderError::Execution("employee cost parameters lock poisoned".to_string()))
    }

    pub fn set_params(&self, params: EmployeeCostParams) -> Result<(), ProviderError> {
        let mut guard = self
            .params
            .write()
            .map_err(|_| ProviderError::Execution("employee cost parameters lock poisoned".to_string()))?;
        *guard = params;
        Ok(())
    }

    /// Set headcount for one role and period. Unknown roles are added.
    pub fn set_headcount(&self, role: &str, period: &str, count: f64) -> Result<(), ProviderError> {
        let mut params = self.params()?;
        match params.roles.iter_mut().find(|r| r.name == role) {
            Some(existing) => {
                existing.count.insert(period.to_string(), count);
            }
            None => params.roles.push(StaffRole {
                name: role.to_string(),
                count: BTreeMap::from([(period.to_string(), count)]),
                salary: BTreeMap::new(),
            }),
        }
        self.set_params(params)
    }

    pub fn calculate(&self) -> Result<ModuleResult, ProviderError> {
        let params = self.params()?;
        let mut totals = BTreeMap::new();
        let mut headcounts = BTreeMap::new();
        let mut average_salaries = BTreeMap::new();
        let mut breakdown = BTreeMap::new();

        for period in self.horizon.periods() {
            let benefits = at(&params.benefits_percentage, period);
            let multiplier = 1.0 + benefits / 100.0;

            let mut employees = 0.0;
            let mut base_payroll = 0.0;
            let mut total = 0.0;
            let mut roles = serde_json::Map::new();
            for role in &params.roles {
                let count = at(&role.count, period);
                let salary = at(&role.salary, period);
                let cost = count * salary * multiplier;
                employees += count;
                base_payroll += count * salary;
                total += cost;
                roles.insert(
                    role.name.clone(),
                    json!({"count": count, "baseSalary": salary, "totalCost": cost}),
                );
            }
            roles.insert(
                "benefits".to_string(),
                json!({"percentage": benefits, "totalCost": total - base_payroll}),
            );

            let average = if employees > 0.0 { base_payroll / employees } else { 0.0 };
            totals.insert(period.clone(), total);
            headcounts.insert(period.clone(), employees);
            average_salaries.insert(period.clone(), average);
            breakdown.insert(period.clone(), serde_json::Value::Object(roles));
        }

        Ok(ModuleResult::ready(self.id.clone())
            .with_costs(totals)
            .with_detail("employeeCountsByYear", json!(headcounts))
            .with_detail("averageSalaryByYear", json!(average_salaries))
            .with_detail("breakdownByYear", json!(breakdown)))
    }
}

impl ResultProvider for EmployeeCostsModule {
    fn get_result(&self) -> Result<ModuleResult, ProviderError> {
        self.calculate()
    }
}
