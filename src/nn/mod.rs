//! Neural network inference.
//!
//! The two recognition models are opaque pre-trained ONNX blobs loaded once per session. This
//! module wraps the inference engine behind the [`Classifier`] capability so the pipelines
//! never care whether a prediction is computed in-process ([`NnClassifier`]), on a worker
//! thread ([`ThreadedClassifier`]), or by something else entirely (test stubs, a remote
//! service).

pub mod tensor;

use std::{borrow::Cow, io, path::Path, sync::Arc};

use tensor::Tensor;
use tract_onnx::prelude::{
    tvec, Framework, Graph, InferenceModelExt, SimplePlan, TValue, TypedFact, TypedOp,
};

use crate::worker::{promise, Promise, PromiseHandle, Worker};

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Neural network loader.
pub struct Loader<'a> {
    model_data: Cow<'a, [u8]>,
}

impl<'a> Loader<'a> {
    /// Loads and optimizes the network.
    ///
    /// Returns an error if the network data is malformed or incomplete, or if the network uses
    /// unimplemented operations.
    pub fn load(self) -> anyhow::Result<NeuralNetwork> {
        let graph = tract_onnx::onnx()
            .model_for_read(&mut &*self.model_data)?
            .into_optimized()?;
        let model = SimplePlan::new(graph)?;
        Ok(NeuralNetwork(Arc::new(model)))
    }
}

/// A neural network that can be used for inference.
///
/// This is a cheaply [`Clone`]able handle to the underlying network structures.
#[derive(Clone)]
pub struct NeuralNetwork(Arc<Model>);

impl NeuralNetwork {
    /// Loads a pre-trained model from an ONNX file path.
    ///
    /// The path must have a `.onnx` extension.
    pub fn from_path<'a, P: AsRef<Path>>(path: P) -> anyhow::Result<Loader<'a>> {
        Self::from_path_impl(path.as_ref())
    }

    fn from_path_impl<'a>(path: &Path) -> anyhow::Result<Loader<'a>> {
        match path.extension() {
            Some(ext) if ext == "onnx" => {}
            _ => anyhow::bail!("neural network file must have `.onnx` extension"),
        }

        let model_data = std::fs::read(path)?;
        Ok(Loader {
            model_data: model_data.into(),
        })
    }

    /// Loads a pre-trained model from an in-memory ONNX file.
    pub fn from_onnx(raw: &[u8]) -> Loader<'_> {
        Loader {
            model_data: raw.into(),
        }
    }

    /// Returns the number of input nodes of the network.
    pub fn num_inputs(&self) -> usize {
        self.0.model().inputs.len()
    }

    /// Returns the number of output nodes of the network.
    pub fn num_outputs(&self) -> usize {
        self.0.model().outputs.len()
    }

    /// Returns the concrete tensor shape of input node `index`.
    pub fn input_shape(&self, index: usize) -> anyhow::Result<Vec<usize>> {
        let fact = self.0.model().input_fact(index)?;
        fact.shape
            .as_concrete()
            .map(|shape| shape.to_vec())
            .ok_or_else(|| anyhow::anyhow!("symbolic input shape on node {index}"))
    }

    /// Returns the concrete tensor shape of output node `index`.
    pub fn output_shape(&self, index: usize) -> anyhow::Result<Vec<usize>> {
        let fact = self.0.model().output_fact(index)?;
        fact.shape
            .as_concrete()
            .map(|shape| shape.to_vec())
            .ok_or_else(|| anyhow::anyhow!("symbolic output shape on node {index}"))
    }

    /// Runs the network on an input tensor, returning the output tensors.
    #[doc(alias = "infer")]
    pub fn estimate(&self, input: &Tensor) -> anyhow::Result<Vec<Tensor>> {
        let outputs = self
            .0
            .run(tvec![TValue::from_const(Arc::new(input.to_tract()))])?;
        Ok(outputs.iter().map(|t| Tensor::from_tract(t)).collect())
    }
}

/// A probability vector over a model's classes.
#[derive(Debug, Clone, PartialEq)]
pub struct Probabilities {
    values: Vec<f32>,
}

impl Probabilities {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns whether every probability is a finite number.
    ///
    /// Models occasionally produce NaN/∞ on degenerate inputs; such an output must be
    /// discarded entirely, never treated as low confidence.
    pub fn all_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// Returns the most probable class index and its probability.
    pub fn top(&self) -> Option<(usize, f32)> {
        self.values
            .iter()
            .copied()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
    }
}

/// The capability both recognition pipelines consume: turn a feature tensor into class
/// probabilities.
///
/// `classify` is *polled*, not awaited: an implementation backed by slow or asynchronous
/// machinery may return `Ok(None)` for a submission that was dropped or is still in flight,
/// and hand out the finished probabilities on a later call. Synchronous implementations simply
/// always return `Ok(Some(..))`. An `Err` means this cycle produced no prediction; it never
/// poisons the classifier for future calls.
pub trait Classifier: Send {
    fn classify(&mut self, input: Tensor) -> anyhow::Result<Option<Probabilities>>;

    /// The number of classes in this classifier's output vector.
    fn num_classes(&self) -> usize;
}

/// Synchronous in-process classifier over a [`NeuralNetwork`].
pub struct NnClassifier {
    nn: NeuralNetwork,
    num_classes: usize,
}

impl NnClassifier {
    /// Wraps a loaded network, validating that it is a single-input single-output classifier
    /// with a `[1, classes]` output.
    pub fn new(nn: NeuralNetwork) -> anyhow::Result<Self> {
        if nn.num_inputs() != 1 || nn.num_outputs() != 1 {
            anyhow::bail!(
                "classifier network must have 1 input and 1 output, this one has {} and {}",
                nn.num_inputs(),
                nn.num_outputs(),
            );
        }
        let output_shape = nn.output_shape(0)?;
        let num_classes = match &output_shape[..] {
            [1, classes] => *classes,
            _ => anyhow::bail!("unsupported classifier output shape {output_shape:?}"),
        };
        Ok(Self { nn, num_classes })
    }

    /// Loads the model at `path` and wraps it.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::new(NeuralNetwork::from_path(path)?.load()?)
    }
}

impl Classifier for NnClassifier {
    fn classify(&mut self, input: Tensor) -> anyhow::Result<Option<Probabilities>> {
        let outputs = self.nn.estimate(&input)?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow::anyhow!("network returned no output tensor"))?;
        Ok(Some(Probabilities::new(output.index(0).as_slice().to_vec())))
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

type ClassifyResult = anyhow::Result<Option<Probabilities>>;

/// Runs another classifier on a dedicated worker thread, at most one request in flight.
///
/// A call while a request is in flight is *dropped*, not queued; recognition prefers a fresh
/// window over a stale backlog. The in-flight handle doubles as the pipeline's busy-flag, and
/// it is cleared no matter how the inner call ends (result, error, or thread death), so a
/// faulting model can never permanently wedge its pipeline.
pub struct ThreadedClassifier {
    worker: Worker<(Tensor, Promise<ClassifyResult>)>,
    pending: Option<PromiseHandle<ClassifyResult>>,
    num_classes: usize,
}

impl ThreadedClassifier {
    /// Moves `inner` onto a new worker thread named `name`.
    pub fn spawn<C: Classifier + 'static>(mut inner: C, name: &str) -> io::Result<Self> {
        let num_classes = inner.num_classes();
        let worker = Worker::builder().name(name).spawn(
            move |(input, promise): (Tensor, Promise<ClassifyResult>)| {
                promise.fulfill(inner.classify(input));
            },
        )?;
        Ok(Self {
            worker,
            pending: None,
            num_classes,
        })
    }
}

impl Classifier for ThreadedClassifier {
    fn classify(&mut self, input: Tensor) -> ClassifyResult {
        let ready = match self.pending.as_mut().map(PromiseHandle::poll) {
            // A request is in flight; this one is dropped.
            Some(None) => return Ok(None),
            Some(Some(Ok(result))) => {
                self.pending = None;
                Some(result)
            }
            Some(Some(Err(_))) => {
                self.pending = None;
                anyhow::bail!("classifier worker exited without a result");
            }
            None => None,
        };

        let (promise, handle) = promise();
        self.worker.send((input, promise));
        self.pending = Some(handle);

        match ready {
            Some(result) => result,
            None => Ok(None),
        }
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}
